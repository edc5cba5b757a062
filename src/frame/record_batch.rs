//! Arrow export
//!
//! Converts a finished [`Frame`] into a `RecordBatch` for the downstream
//! rendering and storage layers. Labels travel as field metadata, frame
//! metadata travels as schema metadata.

use super::{Field, FieldValues, Frame};
use crate::{Error, Result};

use arrow_array::{
    ArrayRef, Float64Array, Int8Array, RecordBatch, RecordBatchOptions, StringArray,
    TimestampNanosecondArray,
};
use arrow_schema::{DataType, Field as ArrowField, Schema, TimeUnit};
use std::collections::HashMap;
use std::sync::Arc;

/// Field metadata key holding the canonical label JSON
pub const FIELD_LABELS_METADATA_KEY: &str = "promframes.labels";
/// Field metadata key marking columns whose Utf8 payload is JSON text
pub const FIELD_TYPE_METADATA_KEY: &str = "promframes.type";

const SCHEMA_NAME_KEY: &str = "promframes.name";
const SCHEMA_META_KEY: &str = "promframes.meta";

impl Frame {
    /// Build an Arrow record batch; the frame must be aligned
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        if !self.is_aligned() {
            return Err(Error::Arrow(arrow_schema::ArrowError::InvalidArgumentError(
                format!("frame '{}' has fields of different lengths", self.name),
            )));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let (arrow_field, column) = convert_field(field)?;
            fields.push(arrow_field);
            columns.push(column);
        }

        let mut metadata = HashMap::new();
        metadata.insert(SCHEMA_NAME_KEY.to_string(), self.name.clone());
        metadata.insert(SCHEMA_META_KEY.to_string(), serde_json::to_string(&self.meta)?);

        let schema = Arc::new(Schema::new(fields).with_metadata(metadata));
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count()));
        Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
    }
}

fn convert_field(field: &Field) -> Result<(ArrowField, ArrayRef)> {
    let mut metadata = HashMap::new();
    if let Some(labels) = &field.labels {
        metadata.insert(
            FIELD_LABELS_METADATA_KEY.to_string(),
            labels.to_json_string()?,
        );
    }

    let (data_type, column): (DataType, ArrayRef) = match field.values() {
        FieldValues::Time(values) => {
            let nanos = values
                .iter()
                .map(|v| match v {
                    Some(t) => t.timestamp_nanos_opt().map(Some).ok_or_else(|| {
                        Error::TimeFormat(format!(
                            "time {} in field '{}' is outside the nanosecond range",
                            t, field.name
                        ))
                    }),
                    None => Ok(None),
                })
                .collect::<Result<Vec<Option<i64>>>>()?;
            (
                DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
                Arc::new(TimestampNanosecondArray::from(nanos).with_timezone("UTC")),
            )
        }
        FieldValues::Float64(values) => (
            DataType::Float64,
            Arc::new(Float64Array::from(values.clone())),
        ),
        FieldValues::String(values) => (
            DataType::Utf8,
            Arc::new(StringArray::from(values.clone())),
        ),
        FieldValues::Int8(values) => (DataType::Int8, Arc::new(Int8Array::from(values.clone()))),
        FieldValues::Json(values) => {
            metadata.insert(FIELD_TYPE_METADATA_KEY.to_string(), "json".to_string());
            let text: Vec<Option<String>> = values
                .iter()
                .map(|v| v.as_ref().map(|v| v.to_string()))
                .collect();
            (DataType::Utf8, Arc::new(StringArray::from(text)))
        }
    };

    let arrow_field = ArrowField::new(&field.name, data_type, true).with_metadata(metadata);
    Ok((arrow_field, column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FieldType, FrameMeta, FrameType, Labels};
    use arrow_array::cast::AsArray;
    use arrow_array::types::TimestampNanosecondType;
    use arrow_array::Array;
    use chrono::DateTime;

    #[test]
    fn test_time_value_frame_to_batch() {
        let mut time = Field::new("Time", FieldType::Time);
        time.append(DateTime::from_timestamp_millis(1_000).unwrap())
            .unwrap();
        let labels: Labels = [("instance", "a")].into_iter().collect();
        let mut value = Field::new("Value", FieldType::Float64).with_labels(labels);
        value.append(1.5).unwrap();

        let frame = Frame::new("", vec![time, value])
            .with_meta(FrameMeta::for_result_type(FrameType::TimeSeriesMulti, "matrix"));
        let batch = frame.to_record_batch().unwrap();

        assert_eq!(batch.num_rows(), 1);
        let ts = batch.column(0).as_primitive::<TimestampNanosecondType>();
        assert_eq!(ts.value(0), 1_000_000_000);

        let schema = batch.schema();
        let value_field = schema.field(1);
        assert_eq!(
            value_field.metadata().get(FIELD_LABELS_METADATA_KEY).unwrap(),
            r#"{"instance":"a"}"#
        );
        assert!(schema.metadata().get(SCHEMA_META_KEY).unwrap().contains("timeseries-multi"));
    }

    #[test]
    fn test_json_and_nulls() {
        let mut blob = Field::new("__labels", FieldType::Json);
        blob.append(serde_json::json!({"a": "b"})).unwrap();
        blob.extend_nulls(1);
        let batch = Frame::new("", vec![blob]).to_record_batch().unwrap();

        let col = batch.column(0).as_string::<i32>();
        assert_eq!(col.value(0), r#"{"a":"b"}"#);
        assert!(col.is_null(1));
        assert_eq!(
            batch.schema().field(0).metadata().get(FIELD_TYPE_METADATA_KEY).unwrap(),
            "json"
        );
    }

    #[test]
    fn test_unaligned_frame_rejected() {
        let mut a = Field::new("a", FieldType::Float64);
        a.append(1.0).unwrap();
        let b = Field::new("b", FieldType::Float64);
        assert!(Frame::new("", vec![a, b]).to_record_batch().is_err());
    }
}
