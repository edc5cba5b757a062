//! Single-sample results

use super::{parse_float, ResultType};
use crate::frame::{
    Field, FieldType, Frame, FrameMeta, FrameType, Labels, TIME_FIELD_NAME, VALUE_FIELD_NAME,
};
use crate::time::time_from_float;
use crate::Result;

/// `[t, "v"]` as a one-row numeric frame
pub(super) fn scalar_frame(t: f64, v: &str) -> Result<Vec<Frame>> {
    let mut time = Field::new(TIME_FIELD_NAME, FieldType::Time);
    let mut value = Field::new(VALUE_FIELD_NAME, FieldType::Float64).with_labels(Labels::new());
    time.append(time_from_float(t)?)?;
    value.append(parse_float(v)?)?;

    let meta = FrameMeta::for_result_type(FrameType::NumericMulti, ResultType::Scalar.as_str());
    Ok(vec![Frame::new("", vec![time, value]).with_meta(meta)])
}

/// `[t, "text"]` as a one-row frame with a string value
pub(super) fn string_frame(t: f64, text: String) -> Result<Vec<Frame>> {
    let mut time = Field::new(TIME_FIELD_NAME, FieldType::Time);
    let mut value = Field::new(VALUE_FIELD_NAME, FieldType::String).with_labels(Labels::new());
    time.append(time_from_float(t)?)?;
    value.append(text)?;

    let meta = FrameMeta::for_result_type(FrameType::TimeSeriesMulti, ResultType::String.as_str());
    Ok(vec![Frame::new("", vec![time, value]).with_meta(meta)])
}
