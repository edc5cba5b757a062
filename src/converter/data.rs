//! `data` routing by shape and `resultType`

use super::{array, matrix, scalar, stream, DecodeContext, ResultType};
use crate::frame::{Frame, STATS_CUSTOM_KEY};
use crate::Error;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// `data`: an object keyed by `resultType`/`result`, or a bare array
pub(super) struct DataSeed<'c> {
    pub(super) ctx: &'c DecodeContext,
}

impl<'de> DeserializeSeed<'de> for DataSeed<'_> {
    type Value = Vec<Frame>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Vec<Frame>, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for DataSeed<'_> {
    type Value = Vec<Frame>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a data object or array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Vec<Frame>, A::Error> {
        array::ArrayData { ctx: self.ctx }.visit_seq(seq)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Vec<Frame>, A::Error> {
        let mut result_type = String::new();
        let mut frames = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "resultType" => result_type = map.next_value()?,
                "result" => {
                    frames = map.next_value_seed(ResultSeed {
                        ctx: self.ctx,
                        result_type: &result_type,
                    })?
                }
                "stats" => {
                    let stats: Value = map.next_value()?;
                    if let Some(first) = frames.first_mut() {
                        first.meta.custom.insert(STATS_CUSTOM_KEY.to_string(), stats);
                    }
                }
                other => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(key = other, "Skipping unsupported data key");
                }
            }
        }

        Ok(frames)
    }
}

/// `result`, interpreted by the `resultType` seen so far
struct ResultSeed<'c, 'r> {
    ctx: &'c DecodeContext,
    result_type: &'r str,
}

impl<'de> DeserializeSeed<'de> for ResultSeed<'_, '_> {
    type Value = Vec<Frame>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Vec<Frame>, D::Error> {
        let ctx = self.ctx;
        let Some(parsed) = ResultType::parse(self.result_type) else {
            // Consume the value before failing
            deserializer.deserialize_ignored_any(IgnoredAny)?;
            return Err(ctx.fail(Error::UnknownResultType(self.result_type.to_string())));
        };

        match parsed {
            ResultType::Matrix | ResultType::Vector => deserializer.deserialize_seq(matrix::SeriesList {
                ctx,
                result_type: parsed,
            }),
            ResultType::Streams => deserializer.deserialize_seq(stream::Streams { ctx }),
            ResultType::Scalar => {
                let (t, v) = <(f64, String)>::deserialize(deserializer)?;
                ctx.check(scalar::scalar_frame(t, &v))
            }
            ResultType::String => {
                let (t, text) = <(f64, String)>::deserialize(deserializer)?;
                ctx.check(scalar::string_frame(t, text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::run;
    use super::*;
    use crate::config::DecoderOptions;

    fn read(text: &str) -> crate::Result<Vec<Frame>> {
        run(text, DecoderOptions::default(), |ctx, de| {
            DataSeed { ctx }.deserialize(de)
        })
    }

    #[test]
    fn test_unknown_result_type() {
        let err = read(r#"{"resultType": "bogus", "result": [1, 2]}"#).unwrap_err();
        assert_eq!(err.to_string(), "unknown result type: bogus");
    }

    #[test]
    fn test_result_before_result_type_is_unknown() {
        let err = read(r#"{"result": [], "resultType": "vector"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownResultType(t) if t.is_empty()));
    }

    #[test]
    fn test_stats_attached_to_first_frame() {
        let frames = read(
            r#"{"resultType": "scalar", "result": [1, "2"], "stats": {"summary": {"bytes": 10}}}"#,
        )
        .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].meta.custom[STATS_CUSTOM_KEY]["summary"]["bytes"],
            10
        );
        assert_eq!(frames[0].meta.result_type(), Some("scalar"));
    }

    #[test]
    fn test_stats_without_frames_is_consumed() {
        let frames = read(r#"{"stats": {"a": 1}, "resultType": "vector", "result": []}"#).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_string_result_routed() {
        let frames = read(r#"{"resultType": "string", "result": [1, "hi"]}"#).unwrap();
        assert_eq!(frames[0].meta.result_type(), Some("string"));
    }

    #[test]
    fn test_scalar_with_extra_element_rejected() {
        let err = read(r#"{"resultType": "scalar", "result": [1, "2", 3]}"#).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_non_object_data_rejected() {
        let err = read(r#""oops""#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
