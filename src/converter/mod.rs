//! Prometheus/Loki result converter
//!
//! Walks a query response envelope with `serde_json`'s streaming
//! deserializer and produces frames:
//!
//! - **matrix / vector**: one time series frame per series, or a heatmap
//!   frame when the series carries sparse histograms
//! - **streams**: a single log frame aggregating every stream group
//! - **scalar / string**: a single one-row frame
//! - **bare array** `data`: label-value tables, exemplar frames and plain
//!   string lists
//!
//! Each payload shape has its own `DeserializeSeed`/`Visitor`, so samples are
//! appended straight into columns without materializing a JSON tree.
//!
//! Decoding is all-or-nothing: any fatal condition discards every frame
//! built so far and only the error is returned.

mod array;
mod data;
mod histogram;
mod matrix;
mod scalar;
mod stream;

pub use histogram::{
    HistogramAccumulator, HISTOGRAM_COUNT_FIELD, HISTOGRAM_LAYOUT_FIELD, HISTOGRAM_TIME_FIELD,
    HISTOGRAM_Y_MAX_FIELD, HISTOGRAM_Y_MIN_FIELD,
};
pub use stream::{STREAM_LABELS_FIELD, STREAM_LINE_FIELD, STREAM_TIME_FIELD, STREAM_TS_FIELD};

use crate::config::DecoderOptions;
use crate::frame::{Frame, Notice};
use crate::Error;

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::io;
use tracing::debug;

/// The `resultType` discriminator of a Prometheus-style payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Matrix,
    Vector,
    Streams,
    Scalar,
    String,
}

impl ResultType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "matrix" => Some(ResultType::Matrix),
            "vector" => Some(ResultType::Vector),
            "streams" => Some(ResultType::Streams),
            "scalar" => Some(ResultType::Scalar),
            "string" => Some(ResultType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Matrix => "matrix",
            ResultType::Vector => "vector",
            ResultType::Streams => "streams",
            ResultType::Scalar => "scalar",
            ResultType::String => "string",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode a complete response payload held in memory
pub fn decode(payload: &[u8], opts: &DecoderOptions) -> crate::Result<Vec<Frame>> {
    let mut de = serde_json::Deserializer::from_slice(payload);
    let frames = read_prometheus_style_result(&mut de, opts)?;
    de.end()?;
    Ok(frames)
}

/// Decode a response payload from a byte stream
pub fn decode_reader<R: io::Read>(reader: R, opts: &DecoderOptions) -> crate::Result<Vec<Frame>> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let frames = read_prometheus_style_result(&mut de, opts)?;
    de.end()?;
    Ok(frames)
}

/// Read a Prometheus or Loki response envelope from a deserializer
/// positioned at the root object.
///
/// `status: "error"` wins over any data already read. Warnings are attached
/// to every returned frame. Trailing input is left for the caller to check.
pub fn read_prometheus_style_result<'de, R>(
    de: &mut serde_json::Deserializer<R>,
    opts: &DecoderOptions,
) -> crate::Result<Vec<Frame>>
where
    R: serde_json::de::Read<'de>,
{
    let ctx = DecodeContext::new(*opts);
    match (ResponseSeed { ctx: &ctx }).deserialize(de) {
        Ok(envelope) => envelope.into_frames(),
        Err(e) => Err(ctx.into_error(e)),
    }
}

/// State shared by every visitor of one decode call.
///
/// Visitors can only report `serde` errors, so domain failures are parked
/// here and take precedence over the wrapped message once decoding aborts.
struct DecodeContext {
    opts: DecoderOptions,
    failure: RefCell<Option<Error>>,
}

impl DecodeContext {
    fn new(opts: DecoderOptions) -> Self {
        Self {
            opts,
            failure: RefCell::new(None),
        }
    }

    /// Record `err` and produce the deserializer error that aborts decoding
    fn fail<E: de::Error>(&self, err: Error) -> E {
        let abort = E::custom(&err);
        let mut slot = self.failure.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
        abort
    }

    fn check<E: de::Error, T>(&self, result: crate::Result<T>) -> Result<T, E> {
        result.map_err(|err| self.fail(err))
    }

    fn into_error(self, e: serde_json::Error) -> Error {
        self.failure.into_inner().unwrap_or(Error::Json(e))
    }
}

#[derive(Debug)]
struct Envelope {
    status: String,
    error_type: String,
    error: String,
    warnings: Vec<Notice>,
    frames: Vec<Frame>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            status: String::from("unknown"),
            error_type: String::new(),
            error: String::new(),
            warnings: Vec::new(),
            frames: Vec::new(),
        }
    }
}

impl Envelope {
    fn into_frames(self) -> crate::Result<Vec<Frame>> {
        if self.status == "error" {
            return Err(Error::Prometheus {
                error_type: self.error_type,
                message: self.error,
            });
        }

        let mut frames = self.frames;
        if !self.warnings.is_empty() {
            for frame in &mut frames {
                frame.meta.notices.extend(self.warnings.iter().cloned());
            }
        }

        debug!(
            status = %self.status,
            frames = frames.len(),
            warnings = self.warnings.len(),
            "Decoded query response"
        );
        Ok(frames)
    }
}

struct ResponseSeed<'c> {
    ctx: &'c DecodeContext,
}

impl<'de> DeserializeSeed<'de> for ResponseSeed<'_> {
    type Value = Envelope;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Envelope, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for ResponseSeed<'_> {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a query response object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Envelope, A::Error> {
        let mut envelope = Envelope::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "status" => envelope.status = map.next_value()?,
                "data" => envelope.frames = map.next_value_seed(data::DataSeed { ctx: self.ctx })?,
                "error" => envelope.error = map.next_value()?,
                "errorType" => envelope.error_type = map.next_value()?,
                "warnings" => envelope.warnings = warnings_from_value(map.next_value()?),
                other => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(key = other, "Skipping unsupported response key");
                }
            }
        }
        Ok(envelope)
    }
}

/// Non-string entries and non-array values are ignored
fn warnings_from_value(value: Value) -> Vec<Notice> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(Notice::warning(text)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Next tuple element, or an invalid-length error naming the tuple shape
fn next_required<'de, A, T>(seq: &mut A, index: usize, shape: &'static str) -> Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, &shape))
}

/// True when the tuple has elements left after the expected ones
fn has_trailing_element<'de, A: SeqAccess<'de>>(seq: &mut A) -> Result<bool, A::Error> {
    Ok(seq.next_element::<IgnoredAny>()?.is_some())
}

fn parse_float(s: &str) -> crate::Result<f64> {
    s.parse::<f64>().map_err(|source| Error::ParseFloat {
        value: s.to_string(),
        source,
    })
}

/// Strings verbatim, anything else as JSON text
fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Insert or overwrite, keeping first-seen key order
fn upsert_pair(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

/// Run a visitor over `text` the way [`decode`] does
#[cfg(test)]
fn run<T>(
    text: &str,
    opts: DecoderOptions,
    read: impl FnOnce(
        &DecodeContext,
        &mut serde_json::Deserializer<serde_json::de::StrRead<'_>>,
    ) -> Result<T, serde_json::Error>,
) -> crate::Result<T> {
    let ctx = DecodeContext::new(opts);
    let mut de = serde_json::Deserializer::from_str(text);
    let result = read(&ctx, &mut de).and_then(|value| de.end().map(|()| value));
    result.map_err(|e| ctx.into_error(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_type_parse() {
        assert_eq!(ResultType::parse("matrix"), Some(ResultType::Matrix));
        assert_eq!(ResultType::parse("streams"), Some(ResultType::Streams));
        assert_eq!(ResultType::parse("Matrix"), None);
        assert_eq!(ResultType::Vector.to_string(), "vector");
    }

    #[test]
    fn test_domain_failure_wins_over_wrapped_message() {
        let ctx = DecodeContext::new(DecoderOptions::default());
        let abort: serde_json::Error = ctx.fail(Error::Histogram("first".into()));
        let _: serde_json::Error = ctx.fail(Error::Histogram("second".into()));

        let err = ctx.into_error(abort);
        assert_eq!(err.to_string(), "invalid histogram: first");
    }

    #[test]
    fn test_warnings_skip_non_strings() {
        let warnings = warnings_from_value(json!(["a", 1, {"x": 2}, "b"]));
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[1].text, "b");
        assert!(warnings_from_value(json!("not a list")).is_empty());
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(json!("x")), "x");
        assert_eq!(value_to_string(json!(12)), "12");
        assert_eq!(value_to_string(json!(null)), "null");
    }

    #[test]
    fn test_upsert_pair_keeps_order() {
        let mut pairs = Vec::new();
        upsert_pair(&mut pairs, "b".into(), "1".into());
        upsert_pair(&mut pairs, "a".into(), "2".into());
        upsert_pair(&mut pairs, "b".into(), "3".into());
        assert_eq!(
            pairs,
            vec![("b".to_string(), "3".to_string()), ("a".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_root_must_be_object() {
        let err = decode(b"[1, 2]", &DecoderOptions::default()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_decode_reader_matches_slice() {
        let body = br#"{"status":"success","data":{"resultType":"scalar","result":[1,"2"]}}"#;
        let opts = DecoderOptions::default();
        let from_slice = decode(body, &opts).unwrap();
        let from_reader = decode_reader(&body[..], &opts).unwrap();
        assert_eq!(from_slice, from_reader);
    }
}
