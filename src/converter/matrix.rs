//! Matrix and vector results: one frame per series

use super::histogram::{HistogramAccumulator, HistogramEntry, HistogramList};
use super::{parse_float, DecodeContext, ResultType};
use crate::config::DecoderOptions;
use crate::frame::{
    Field, FieldType, Frame, FrameMeta, FrameType, Labels, Notice, DATAPLANE_TYPE_VERSION,
    TIME_FIELD_NAME, VALUE_FIELD_NAME,
};
use crate::time::time_from_float;
use crate::Result;

use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;
use tracing::{debug, trace};

/// What a single series decoded into
enum SeriesOutput {
    Plain {
        labels: Labels,
        time: Field,
        value: Field,
    },
    Histogram {
        labels: Labels,
        histogram: HistogramAccumulator,
        /// Plain samples that were read but not emitted
        dropped_samples: usize,
    },
}

/// `result` array of a matrix or vector response
pub(super) struct SeriesList<'c> {
    pub(super) ctx: &'c DecodeContext,
    pub(super) result_type: ResultType,
}

impl<'de> Visitor<'de> for SeriesList<'_> {
    type Value = Vec<Frame>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of series")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<Frame>, A::Error> {
        let mut frames = Vec::new();

        while let Some(series) = seq.next_element_seed(SeriesSeed { ctx: self.ctx })? {
            let frame = match series {
                SeriesOutput::Plain {
                    labels,
                    time,
                    value,
                } => series_frame(labels, time, value, self.result_type, &self.ctx.opts),
                SeriesOutput::Histogram {
                    labels,
                    histogram,
                    dropped_samples,
                } => {
                    let notice = (dropped_samples > 0).then(|| {
                        Notice::warning(format!(
                            "series {} has both value samples and histograms; \
                             {} value samples were dropped",
                            labels, dropped_samples
                        ))
                    });
                    let mut frame = histogram.into_frame(VALUE_FIELD_NAME, labels);
                    if let Some(notice) = notice {
                        frame.append_notice(notice);
                    }
                    frame
                }
            };
            frames.push(frame);
        }

        debug!(
            result_type = %self.result_type,
            series = frames.len(),
            "Decoded series result"
        );
        Ok(frames)
    }
}

/// One `{metric, value|values|histogram|histograms}` object
struct SeriesSeed<'c> {
    ctx: &'c DecodeContext,
}

impl<'de> DeserializeSeed<'de> for SeriesSeed<'_> {
    type Value = SeriesOutput;

    fn deserialize<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<SeriesOutput, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for SeriesSeed<'_> {
    type Value = SeriesOutput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a series object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<SeriesOutput, A::Error> {
        let ctx = self.ctx;
        let mut labels = Labels::new();
        let mut time = Field::new(TIME_FIELD_NAME, FieldType::Time);
        let mut value = Field::new(VALUE_FIELD_NAME, FieldType::Float64);
        let mut histogram: Option<HistogramAccumulator> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "metric" => labels = map.next_value()?,
                "value" => {
                    let (t, v): (f64, String) = map.next_value()?;
                    ctx.check::<A::Error, _>(append_sample(&mut time, &mut value, t, &v))?;
                }
                "values" => map.next_value_seed(SampleColumns {
                    ctx,
                    time: &mut time,
                    value: &mut value,
                })?,
                "histogram" => map.next_value_seed(HistogramEntry {
                    ctx,
                    acc: histogram.get_or_insert_with(HistogramAccumulator::new),
                })?,
                "histograms" => map.next_value_seed(HistogramList {
                    ctx,
                    acc: histogram.get_or_insert_with(HistogramAccumulator::new),
                })?,
                other => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(key = other, "Skipping unsupported series key");
                }
            }
        }

        trace!(
            labels = %labels,
            samples = time.len(),
            histogram = histogram.is_some(),
            "Read series"
        );
        Ok(match histogram {
            Some(histogram) => SeriesOutput::Histogram {
                labels,
                histogram,
                dropped_samples: time.len(),
            },
            None => SeriesOutput::Plain {
                labels,
                time,
                value,
            },
        })
    }
}

/// `values`: `[t, "v"]` pairs appended to the series columns
struct SampleColumns<'c, 'f> {
    ctx: &'c DecodeContext,
    time: &'f mut Field,
    value: &'f mut Field,
}

impl<'de> DeserializeSeed<'de> for SampleColumns<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for SampleColumns<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of [timestamp, \"value\"] pairs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let SampleColumns { ctx, time, value } = self;
        while let Some((t, v)) = seq.next_element::<(f64, String)>()? {
            ctx.check::<A::Error, _>(append_sample(time, value, t, &v))?;
        }
        Ok(())
    }
}

fn append_sample(time: &mut Field, value: &mut Field, t: f64, v: &str) -> Result<()> {
    time.append(time_from_float(t)?)?;
    value.append(parse_float(v)?)
}

fn series_frame(
    labels: Labels,
    time: Field,
    value: Field,
    result_type: ResultType,
    opts: &DecoderOptions,
) -> Frame {
    let mut meta = FrameMeta::for_result_type(FrameType::TimeSeriesMulti, result_type.as_str());
    if opts.dataplane {
        if result_type == ResultType::Vector {
            meta.frame_type = FrameType::NumericMulti;
        }
        meta.type_version = Some(DATAPLANE_TYPE_VERSION);
    }

    Frame::new("", vec![time, value.with_labels(labels)]).with_meta(meta)
}

#[cfg(test)]
mod tests {
    use super::super::run;
    use super::*;
    use crate::Error;

    fn read(text: &str, result_type: ResultType, dataplane: bool) -> Result<Vec<Frame>> {
        let opts = DecoderOptions::new().with_dataplane(dataplane);
        run(text, opts, |ctx, de| {
            de.deserialize_seq(SeriesList { ctx, result_type })
        })
    }

    #[test]
    fn test_matrix_series() {
        let frames = read(
            r#"[{"metric": {"job": "api"}, "values": [[1, "1"], [2, "2.5"]]}]"#,
            ResultType::Matrix,
            false,
        )
        .unwrap();

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.row_count(), 2);
        assert_eq!(frame.meta.frame_type, FrameType::TimeSeriesMulti);
        assert_eq!(frame.meta.result_type(), Some("matrix"));
        assert!(frame.meta.type_version.is_none());

        let value = frame.field(VALUE_FIELD_NAME).unwrap();
        assert_eq!(value.labels.as_ref().unwrap().get("job"), Some("api"));
        assert_eq!(value.floats().unwrap(), &[Some(1.0), Some(2.5)]);
    }

    #[test]
    fn test_series_without_metric_gets_empty_labels() {
        let frames = read(r#"[{"value": [1, "1"]}]"#, ResultType::Vector, false).unwrap();
        let value = frames[0].field(VALUE_FIELD_NAME).unwrap();
        assert_eq!(value.labels, Some(Labels::new()));
    }

    #[test]
    fn test_dataplane_vector_is_numeric() {
        let frames = read(r#"[{"value": [1, "1"]}]"#, ResultType::Vector, true).unwrap();
        assert_eq!(frames[0].meta.frame_type, FrameType::NumericMulti);
        assert_eq!(frames[0].meta.type_version, Some((0, 1)));

        let frames = read(r#"[{"values": [[1, "1"]]}]"#, ResultType::Matrix, true).unwrap();
        assert_eq!(frames[0].meta.frame_type, FrameType::TimeSeriesMulti);
        assert_eq!(frames[0].meta.type_version, Some((0, 1)));
    }

    #[test]
    fn test_unknown_series_key_skipped() {
        let frames = read(
            r#"[{"extra": {"deep": [1, 2]}, "value": [1, "3"]}]"#,
            ResultType::Vector,
            false,
        )
        .unwrap();
        assert_eq!(frames[0].row_count(), 1);
    }

    #[test]
    fn test_histogram_wins_with_notice() {
        let frames = read(
            r#"[{"metric": {"__name__": "h"},
                 "values": [[1, "1"]],
                 "histograms": [[1, {"count": "1", "sum": "1", "buckets": [[1, "0", "1", "1"]]}]]}]"#,
            ResultType::Matrix,
            false,
        )
        .unwrap();

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.meta.frame_type, FrameType::HeatmapCells);
        assert_eq!(frame.fields.len(), 5);
        assert_eq!(frame.meta.notices.len(), 1);
        assert!(frame.meta.custom.is_empty());
    }

    #[test]
    fn test_bad_sample_value() {
        let err = read(r#"[{"value": [1, "fast"]}]"#, ResultType::Vector, false).unwrap_err();
        assert!(matches!(err, Error::ParseFloat { value, .. } if value == "fast"));
    }

    #[test]
    fn test_sample_with_extra_element_rejected() {
        let err = read(r#"[{"value": [1, "1", 2]}]"#, ResultType::Vector, false).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_non_string_label_rejected() {
        let err = read(r#"[{"metric": {"n": 1}, "value": [1, "1"]}]"#, ResultType::Vector, false)
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_empty_result() {
        let frames = read("[]", ResultType::Matrix, false).unwrap();
        assert!(frames.is_empty());
    }
}
