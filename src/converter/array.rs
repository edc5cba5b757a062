//! Bare-array `data`: label values, label sets and exemplars
//!
//! Element handling:
//! - strings go to a single `Value` column, emitted last
//! - objects with `exemplars` become one exemplar frame each
//! - other objects are label rows collected into one shared table
//! - anything else is stringified into `Value`
//!
//! A key repeated inside one object keeps its last value.

use super::{parse_float, upsert_pair, value_to_string, DecodeContext};
use crate::frame::{
    Field, FieldRegistry, FieldType, Frame, FrameMeta, FrameType, Labels, Notice, TIME_FIELD_NAME,
    VALUE_FIELD_NAME,
};
use crate::time::time_from_float;
use crate::Result;

use serde::de::value::SeqAccessDeserializer;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Result type recorded on exemplar frames
const EXEMPLAR_RESULT_TYPE: &str = "exemplar";

/// Output slot, kept in order of first appearance
enum Slot {
    Exemplars(Frame),
    LabelTable,
}

/// What a single array element decoded into
enum Element {
    Text(String),
    Exemplars(Frame),
    LabelRow(Vec<(String, String)>),
}

/// `data` given as a bare array
pub(super) struct ArrayData<'c> {
    pub(super) ctx: &'c DecodeContext,
}

impl<'de> Visitor<'de> for ArrayData<'_> {
    type Value = Vec<Frame>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<Frame>, A::Error> {
        let ctx = self.ctx;
        let mut slots = Vec::new();
        let mut label_table = FieldRegistry::new();
        let mut label_rows = 0usize;
        let mut strings = Field::new(VALUE_FIELD_NAME, FieldType::String);

        while let Some(element) = seq.next_element_seed(ElementSeed { ctx })? {
            match element {
                Element::Text(text) => ctx.check::<A::Error, _>(strings.append(text))?,
                Element::Exemplars(frame) => slots.push(Slot::Exemplars(frame)),
                Element::LabelRow(pairs) => {
                    for (name, value) in pairs {
                        let created =
                            ctx.check::<A::Error, _>(label_table.append(&name, value, label_rows))?;
                        if created && label_table.len() == 1 {
                            slots.push(Slot::LabelTable);
                        }
                    }
                    label_table.pad_to_max();
                    label_rows = label_table.max_len();
                }
            }
        }

        let mut label_table = Some(label_table);
        let mut frames = Vec::with_capacity(slots.len() + 1);
        for slot in slots {
            match slot {
                Slot::Exemplars(frame) => frames.push(frame),
                Slot::LabelTable => {
                    if let Some(table) = label_table.take() {
                        frames.push(Frame::new("", table.into_fields()));
                    }
                }
            }
        }
        if !strings.is_empty() {
            frames.push(Frame::new("", vec![strings]));
        }

        debug!(frames = frames.len(), label_rows, "Decoded array data");
        Ok(frames)
    }
}

struct ElementSeed<'c> {
    ctx: &'c DecodeContext,
}

impl<'de> DeserializeSeed<'de> for ElementSeed<'_> {
    type Value = Element;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Element, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ElementSeed<'_> {
    type Value = Element;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Element, E> {
        Ok(Element::Text(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Element, E> {
        Ok(Element::Text(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Element, E> {
        Ok(Element::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Element, E> {
        Ok(Element::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Element, E> {
        Ok(Element::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Element, E> {
        Ok(Element::Text(Value::from(v).to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Element, E> {
        Ok(Element::Text(Value::Null.to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<Element, A::Error> {
        let value = Value::deserialize(SeqAccessDeserializer::new(seq))?;
        Ok(Element::Text(value.to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Element, A::Error> {
        let mut pairs = Vec::new();
        let mut series_labels = Labels::new();
        let mut exemplars = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "seriesLabels" => series_labels = map.next_value()?,
                "exemplars" => {
                    exemplars = Some(map.next_value_seed(Exemplars {
                        ctx: self.ctx,
                        series_labels: series_labels.clone(),
                    })?)
                }
                _ => {
                    let value = value_to_string(map.next_value()?);
                    upsert_pair(&mut pairs, key, value);
                }
            }
        }

        Ok(match exemplars {
            Some(frame) => Element::Exemplars(frame),
            None => Element::LabelRow(pairs),
        })
    }
}

/// Exemplar label set as ordered pairs, last value winning on repeats
struct LabelPairs(Vec<(String, String)>);

impl<'de> Deserialize<'de> for LabelPairs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(LabelPairsVisitor)
    }
}

struct LabelPairsVisitor;

impl<'de> Visitor<'de> for LabelPairsVisitor {
    type Value = LabelPairs;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of label names to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<LabelPairs, A::Error> {
        let mut pairs = Vec::new();
        while let Some((name, value)) = map.next_entry::<String, String>()? {
            upsert_pair(&mut pairs, name, value);
        }
        Ok(LabelPairs(pairs))
    }
}

/// Frame of `Time`, `Value` and one string column per exemplar label
struct ExemplarColumns {
    time: Field,
    value: Field,
    labels: FieldRegistry,
    notices: Vec<Notice>,
    rows: usize,
}

impl ExemplarColumns {
    fn new(series_labels: Labels) -> Self {
        Self {
            time: Field::new(TIME_FIELD_NAME, FieldType::Time),
            value: Field::new(VALUE_FIELD_NAME, FieldType::Float64).with_labels(series_labels),
            labels: FieldRegistry::new(),
            notices: Vec::new(),
            rows: 0,
        }
    }

    fn push_labels(&mut self, pairs: Vec<(String, String)>) -> Result<()> {
        for (name, value) in pairs {
            self.labels.append(&name, value, self.rows)?;
        }
        Ok(())
    }

    /// Close one entry so every column has the same length
    fn end_entry(&mut self) {
        self.rows = (self.rows + 1)
            .max(self.time.len())
            .max(self.value.len())
            .max(self.labels.max_len());
        self.time.pad_to(self.rows);
        self.value.pad_to(self.rows);
        self.labels.pad_all_to(self.rows);
    }

    fn into_frame(self) -> Frame {
        let mut fields = vec![self.time, self.value];
        fields.extend(self.labels.into_fields());

        let mut frame = Frame::new("", fields).with_meta(FrameMeta::for_result_type(
            FrameType::Unset,
            EXEMPLAR_RESULT_TYPE,
        ));
        frame.meta.notices = self.notices;
        frame
    }
}

struct Exemplars<'c> {
    ctx: &'c DecodeContext,
    series_labels: Labels,
}

impl<'de> DeserializeSeed<'de> for Exemplars<'_> {
    type Value = Frame;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Frame, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Exemplars<'_> {
    type Value = Frame;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of exemplars")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Frame, A::Error> {
        let mut columns = ExemplarColumns::new(self.series_labels);
        while seq
            .next_element_seed(Exemplar {
                ctx: self.ctx,
                columns: &mut columns,
            })?
            .is_some()
        {
            columns.end_entry();
        }
        Ok(columns.into_frame())
    }
}

/// `{value, timestamp, labels}`
struct Exemplar<'c, 'e> {
    ctx: &'c DecodeContext,
    columns: &'e mut ExemplarColumns,
}

impl<'de> DeserializeSeed<'de> for Exemplar<'_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for Exemplar<'_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an exemplar object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let Exemplar { ctx, columns } = self;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "value" => {
                    let raw: String = map.next_value()?;
                    let value = ctx.check::<A::Error, _>(parse_float(&raw))?;
                    ctx.check::<A::Error, _>(columns.value.append(value))?;
                }
                "timestamp" => {
                    let t: f64 = map.next_value()?;
                    let time = ctx.check::<A::Error, _>(time_from_float(t))?;
                    ctx.check::<A::Error, _>(columns.time.append(time))?;
                }
                "labels" => {
                    let LabelPairs(pairs) = map.next_value()?;
                    ctx.check::<A::Error, _>(columns.push_labels(pairs))?;
                }
                other => {
                    map.next_value::<IgnoredAny>()?;
                    debug!(key = other, "Unsupported exemplar key");
                    columns.notices.push(Notice::error(format!(
                        "unable to parse key: {} in response body",
                        other
                    )));
                }
            }
        }
        Ok(())
    }
}
