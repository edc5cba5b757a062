//! Loki stream results: every stream group lands in one log frame

use super::DecodeContext;
use crate::frame::{Field, FieldType, Frame, Labels};
use crate::time::time_from_loki_string;
use crate::Result;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace};

pub const STREAM_LABELS_FIELD: &str = "__labels";
pub const STREAM_TIME_FIELD: &str = "Time";
pub const STREAM_LINE_FIELD: &str = "Line";
/// Raw nanosecond timestamp as sent by Loki
pub const STREAM_TS_FIELD: &str = "TS";

/// The four columns shared by every stream group
struct LogColumns {
    labels: Field,
    time: Field,
    line: Field,
    ts: Field,
}

impl LogColumns {
    fn new() -> Self {
        Self {
            labels: Field::new(STREAM_LABELS_FIELD, FieldType::Json),
            time: Field::new(STREAM_TIME_FIELD, FieldType::Time),
            line: Field::new(STREAM_LINE_FIELD, FieldType::String),
            ts: Field::new(STREAM_TS_FIELD, FieldType::String),
        }
    }

    fn len(&self) -> usize {
        self.time.len()
    }

    fn append(&mut self, labels: &Value, ts: String, line: String) -> Result<()> {
        let time = time_from_loki_string(&ts)?;
        self.labels.append(labels.clone())?;
        self.time.append(time)?;
        self.line.append(line)?;
        self.ts.append(ts)
    }

    fn into_frame(self) -> Frame {
        Frame::new("", vec![self.labels, self.time, self.line, self.ts])
    }
}

/// `result` array of a streams response
pub(super) struct Streams<'c> {
    pub(super) ctx: &'c DecodeContext,
}

impl<'de> Visitor<'de> for Streams<'_> {
    type Value = Vec<Frame>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of stream groups")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<Frame>, A::Error> {
        let mut columns = LogColumns::new();
        let mut groups = 0usize;

        while seq
            .next_element_seed(StreamGroup {
                ctx: self.ctx,
                columns: &mut columns,
            })?
            .is_some()
        {
            groups += 1;
            trace!(group = groups, lines = columns.len(), "Read stream group");
        }

        debug!(groups, lines = columns.len(), "Decoded log streams");
        Ok(vec![columns.into_frame()])
    }
}

/// `{stream, values}`. The label set starts empty for every group and only
/// this group's `stream` key replaces it.
struct StreamGroup<'c, 'l> {
    ctx: &'c DecodeContext,
    columns: &'l mut LogColumns,
}

impl<'de> DeserializeSeed<'de> for StreamGroup<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for StreamGroup<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a stream group object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let StreamGroup { ctx, columns } = self;
        let mut labels = Labels::new().to_json();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "stream" => labels = map.next_value::<Labels>()?.to_json(),
                "values" => map.next_value_seed(LogLines {
                    ctx,
                    labels: &labels,
                    columns: &mut *columns,
                })?,
                other => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(key = other, "Skipping unsupported stream key");
                }
            }
        }
        Ok(())
    }
}

/// `values`: `["<ns timestamp>", "<line>"]` pairs
struct LogLines<'c, 'l> {
    ctx: &'c DecodeContext,
    labels: &'l Value,
    columns: &'l mut LogColumns,
}

impl<'de> DeserializeSeed<'de> for LogLines<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for LogLines<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of [timestamp, line] pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let LogLines {
            ctx,
            labels,
            columns,
        } = self;
        while let Some((ts, line)) = seq.next_element::<(String, String)>()? {
            ctx.check::<A::Error, _>(columns.append(labels, ts, line))?;
        }
        Ok(())
    }
}
