//! Sparse histogram buckets to heatmap cells

use super::{has_trailing_element, next_required, parse_float, DecodeContext};
use crate::frame::{Field, FieldType, Frame, FrameMeta, FrameType, Labels, VALUE_FIELD_NAME};
use crate::time::time_from_float;
use crate::{Error, Result};

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;
use tracing::trace;

pub const HISTOGRAM_TIME_FIELD: &str = "xMax";
pub const HISTOGRAM_Y_MIN_FIELD: &str = "yMin";
pub const HISTOGRAM_Y_MAX_FIELD: &str = "yMax";
pub const HISTOGRAM_COUNT_FIELD: &str = "count";
pub const HISTOGRAM_LAYOUT_FIELD: &str = "yLayout";

/// Five parallel columns, one row per bucket across all samples of a series
#[derive(Debug, Clone)]
pub struct HistogramAccumulator {
    time: Field,
    y_min: Field,
    y_max: Field,
    count: Field,
    y_layout: Field,
}

impl Default for HistogramAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramAccumulator {
    pub fn new() -> Self {
        Self {
            time: Field::new(HISTOGRAM_TIME_FIELD, FieldType::Time),
            y_min: Field::new(HISTOGRAM_Y_MIN_FIELD, FieldType::Float64),
            y_max: Field::new(HISTOGRAM_Y_MAX_FIELD, FieldType::Float64),
            count: Field::new(HISTOGRAM_COUNT_FIELD, FieldType::Float64),
            y_layout: Field::new(HISTOGRAM_LAYOUT_FIELD, FieldType::Int8),
        }
    }

    /// Number of bucket rows
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append_bucket(
        &mut self,
        time: DateTime<Utc>,
        layout: i8,
        lower: f64,
        upper: f64,
        count: f64,
    ) -> Result<()> {
        self.time.append(time)?;
        self.y_layout.append(layout)?;
        self.y_min.append(lower)?;
        self.y_max.append(upper)?;
        self.count.append(count)?;
        Ok(())
    }

    /// Build the heatmap-cells frame. Series labels ride on `yMin`.
    pub fn into_frame(self, name: &str, labels: Labels) -> Frame {
        // "Value" is the default series name and carries no information
        let name = if name == VALUE_FIELD_NAME { "" } else { name };
        let fields = vec![
            self.time,
            self.y_min.with_labels(labels),
            self.y_max,
            self.count,
            self.y_layout,
        ];
        Frame::new(name, fields).with_meta(FrameMeta::with_type(FrameType::HeatmapCells))
    }
}

/// `histograms`: a list of entries sharing one accumulator
pub(super) struct HistogramList<'c, 'h> {
    pub(super) ctx: &'c DecodeContext,
    pub(super) acc: &'h mut HistogramAccumulator,
}

impl<'de> DeserializeSeed<'de> for HistogramList<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for HistogramList<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of histogram entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let HistogramList { ctx, acc } = self;
        while seq
            .next_element_seed(HistogramEntry {
                ctx,
                acc: &mut *acc,
            })?
            .is_some()
        {}
        Ok(())
    }
}

/// One `[t, {count, sum, buckets}]` histogram entry
pub(super) struct HistogramEntry<'c, 'h> {
    pub(super) ctx: &'c DecodeContext,
    pub(super) acc: &'h mut HistogramAccumulator,
}

impl<'de> DeserializeSeed<'de> for HistogramEntry<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for HistogramEntry<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ENTRY_SHAPE)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let HistogramEntry { ctx, acc } = self;
        let t: f64 = next_required(&mut seq, 0, ENTRY_SHAPE)?;
        let time = ctx.check::<A::Error, _>(time_from_float(t))?;

        if seq
            .next_element_seed(HistogramBody { ctx, time, acc })?
            .is_none()
        {
            return Err(de::Error::invalid_length(1, &ENTRY_SHAPE));
        }
        if has_trailing_element(&mut seq)? {
            return Err(ctx.fail(Error::Histogram(
                "expected end of histogram entry".to_string(),
            )));
        }
        Ok(())
    }
}

const ENTRY_SHAPE: &str = "a [timestamp, histogram] pair";
const BUCKET_SHAPE: &str = "a [layout, \"lower\", \"upper\", \"count\"] bucket";

/// `{count, sum, buckets}`; count and sum are implied by the buckets
struct HistogramBody<'c, 'h> {
    ctx: &'c DecodeContext,
    time: DateTime<Utc>,
    acc: &'h mut HistogramAccumulator,
}

impl<'de> DeserializeSeed<'de> for HistogramBody<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for HistogramBody<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a histogram object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let HistogramBody { ctx, time, acc } = self;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "buckets" => map.next_value_seed(Buckets {
                    ctx,
                    time,
                    acc: &mut *acc,
                })?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(())
    }
}

struct Buckets<'c, 'h> {
    ctx: &'c DecodeContext,
    time: DateTime<Utc>,
    acc: &'h mut HistogramAccumulator,
}

impl<'de> DeserializeSeed<'de> for Buckets<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Buckets<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of buckets")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let Buckets { ctx, time, acc } = self;
        while seq
            .next_element_seed(Bucket {
                ctx,
                time,
                acc: &mut *acc,
            })?
            .is_some()
        {}
        Ok(())
    }
}

/// `[layout, "lower", "upper", "count"]`
struct Bucket<'c, 'h> {
    ctx: &'c DecodeContext,
    time: DateTime<Utc>,
    acc: &'h mut HistogramAccumulator,
}

impl<'de> DeserializeSeed<'de> for Bucket<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Bucket<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(BUCKET_SHAPE)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        let Bucket { ctx, time, acc } = self;
        let layout: i8 = next_required(&mut seq, 0, BUCKET_SHAPE)?;
        let lower: String = next_required(&mut seq, 1, BUCKET_SHAPE)?;
        let upper: String = next_required(&mut seq, 2, BUCKET_SHAPE)?;
        let count: String = next_required(&mut seq, 3, BUCKET_SHAPE)?;

        if has_trailing_element(&mut seq)? {
            return Err(ctx.fail(Error::Histogram(
                "expected closing of bucket tuple".to_string(),
            )));
        }

        ctx.check(append_bucket(acc, time, layout, &lower, &upper, &count))
    }
}

fn append_bucket(
    acc: &mut HistogramAccumulator,
    time: DateTime<Utc>,
    layout: i8,
    lower: &str,
    upper: &str,
    count: &str,
) -> Result<()> {
    let lower = parse_float(lower)?;
    let upper = parse_float(upper)?;
    let count = parse_float(count)?;
    trace!(layout, lower, upper, count, "Read histogram bucket");
    acc.append_bucket(time, layout, lower, upper, count)
}

#[cfg(test)]
mod tests {
    use super::super::run;
    use super::*;
    use crate::config::DecoderOptions;

    const ENTRY: &str = r#"[1609459200, {"count": "3", "sum": "1.5", "buckets": [
        [0, "0", "0.5", "1"],
        [3, "0.5", "1", "2"]
    ]}]"#;

    fn read(text: &str, acc: &mut HistogramAccumulator) -> Result<()> {
        run(text, DecoderOptions::default(), |ctx, de| {
            HistogramEntry { ctx, acc }.deserialize(de)
        })
    }

    #[test]
    fn test_read_histogram_entry() {
        let mut acc = HistogramAccumulator::new();
        read(ENTRY, &mut acc).unwrap();

        assert_eq!(acc.len(), 2);
        let frame = acc.into_frame("Value", Labels::new());
        assert_eq!(frame.name, "");
        assert_eq!(frame.meta.frame_type, FrameType::HeatmapCells);
        assert!(frame.is_aligned());

        let layout = frame.field(HISTOGRAM_LAYOUT_FIELD).unwrap();
        assert_eq!(layout.int8s().unwrap(), &[Some(0), Some(3)]);
        let y_max = frame.field(HISTOGRAM_Y_MAX_FIELD).unwrap();
        assert_eq!(y_max.floats().unwrap(), &[Some(0.5), Some(1.0)]);
        let count = frame.field(HISTOGRAM_COUNT_FIELD).unwrap();
        assert_eq!(count.floats().unwrap(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_labels_on_y_min() {
        let mut acc = HistogramAccumulator::new();
        read(ENTRY, &mut acc).unwrap();

        let labels: Labels = [("le", "x")].into_iter().collect();
        let frame = acc.into_frame("latency", labels.clone());
        assert_eq!(frame.name, "latency");
        assert_eq!(
            frame.field(HISTOGRAM_Y_MIN_FIELD).unwrap().labels,
            Some(labels)
        );
        assert!(frame.field(HISTOGRAM_TIME_FIELD).unwrap().labels.is_none());
    }

    #[test]
    fn test_histogram_list_shares_accumulator() {
        let mut acc = HistogramAccumulator::new();
        run(
            r#"[[1, {"buckets": [[0, "0", "1", "1"]]}], [2, {"buckets": [[0, "0", "1", "4"]]}]]"#,
            DecoderOptions::default(),
            |ctx, de| HistogramList { ctx, acc: &mut acc }.deserialize(de),
        )
        .unwrap();
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_extra_bucket_element_rejected() {
        let mut acc = HistogramAccumulator::new();
        let err = read(r#"[1, {"buckets": [[0, "0", "1", "1", "extra"]]}]"#, &mut acc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid histogram: expected closing of bucket tuple"
        );
    }

    #[test]
    fn test_extra_entry_element_rejected() {
        let mut acc = HistogramAccumulator::new();
        let err = read(r#"[1, {"buckets": []}, 2]"#, &mut acc).unwrap_err();
        assert_eq!(err.to_string(), "invalid histogram: expected end of histogram entry");
    }

    #[test]
    fn test_short_bucket_is_structural() {
        let mut acc = HistogramAccumulator::new();
        let err = read(r#"[1, {"buckets": [[0, "0", "1"]]}]"#, &mut acc).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_bad_bucket_bound() {
        let mut acc = HistogramAccumulator::new();
        assert!(matches!(
            read(r#"[1, {"buckets": [[0, "low", "1", "1"]]}]"#, &mut acc),
            Err(Error::ParseFloat { .. })
        ));
    }
}
