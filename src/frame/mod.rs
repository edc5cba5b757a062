//! Columnar output model
//!
//! A [`Frame`] is a table of equal-length typed [`Field`]s plus metadata
//! describing how the downstream visualization layer should interpret it.
//! Frames are built fresh for every decode call and handed over by value.

mod field;
mod labels;
mod record_batch;
mod registry;

pub use field::{Field, FieldType, FieldValue, FieldValues};
pub use labels::Labels;
pub use record_batch::{FIELD_LABELS_METADATA_KEY, FIELD_TYPE_METADATA_KEY};
pub use registry::FieldRegistry;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Standard field names
pub const TIME_FIELD_NAME: &str = "Time";
pub const VALUE_FIELD_NAME: &str = "Value";

/// Type version stamped on frames in dataplane mode
pub const DATAPLANE_TYPE_VERSION: (u32, u32) = (0, 1);

/// Frame type tags understood by the visualization layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameType {
    #[default]
    #[serde(rename = "")]
    Unset,
    /// One frame per series, time + value
    #[serde(rename = "timeseries-multi")]
    TimeSeriesMulti,
    /// One frame per series, single numeric value
    #[serde(rename = "numeric-multi")]
    NumericMulti,
    /// Unpacked histogram buckets
    #[serde(rename = "heatmap-cells")]
    HeatmapCells,
}

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Unset => "",
            FrameType::TimeSeriesMulti => "timeseries-multi",
            FrameType::NumericMulti => "numeric-multi",
            FrameType::HeatmapCells => "heatmap-cells",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A non-fatal diagnostic attached to a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    #[serde(rename = "type", default)]
    pub frame_type: FrameType,
    #[serde(rename = "typeVersion", skip_serializing_if = "Option::is_none", default)]
    pub type_version: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub custom: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notices: Vec<Notice>,
}

impl FrameMeta {
    pub fn with_type(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            ..Self::default()
        }
    }

    /// Custom properties carrying the originating result type
    pub fn for_result_type(frame_type: FrameType, result_type: &str) -> Self {
        let mut meta = Self::with_type(frame_type);
        meta.custom.insert(
            RESULT_TYPE_CUSTOM_KEY.to_string(),
            serde_json::Value::String(result_type.to_string()),
        );
        meta
    }

    pub fn result_type(&self) -> Option<&str> {
        self.custom
            .get(RESULT_TYPE_CUSTOM_KEY)
            .and_then(|v| v.as_str())
    }
}

/// Custom metadata key holding the payload `resultType`
pub const RESULT_TYPE_CUSTOM_KEY: &str = "resultType";
/// Custom metadata key holding passthrough query statistics
pub const STATS_CUSTOM_KEY: &str = "stats";

/// A table of equal-length typed columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    pub meta: FrameMeta,
}

impl Frame {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            meta: FrameMeta::default(),
        }
    }

    /// Set metadata
    pub fn with_meta(mut self, meta: FrameMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Number of rows, taken from the longest field
    pub fn row_count(&self) -> usize {
        self.fields.iter().map(|f| f.len()).max().unwrap_or(0)
    }

    /// True when every field has the same length
    pub fn is_aligned(&self) -> bool {
        let rows = self.row_count();
        self.fields.iter().all(|f| f.len() == rows)
    }

    /// Null-extend every field to the longest one
    pub fn pad_fields(&mut self) {
        let rows = self.row_count();
        for field in &mut self.fields {
            field.pad_to(rows);
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn append_notice(&mut self, notice: Notice) {
        self.meta.notices.push(notice);
    }
}
