//! Flat answer set keyed by position id.
use chrono::NaiveDate;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::schema::Coding;

/// One submitted value, tagged with its concrete kind.
///
/// JSON form: `{"type": "decimal", "value": 72.5}`,
/// `{"type": "coded", "value": {"system": "...", "code": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Coded(Coding),
    Decimal(OrderedFloat<f64>),
    Integer(i64),
    String(String),
    Date(NaiveDate),
    Absent,
}

impl AnswerValue {
    pub fn coded(system: impl Into<String>, code: impl Into<String>) -> Self {
        AnswerValue::Coded(Coding::new(system, code, ""))
    }

    pub fn decimal(value: f64) -> Self {
        AnswerValue::Decimal(OrderedFloat(value))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, AnswerValue::Absent)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnswerValue::Coded(_) => "coded",
            AnswerValue::Decimal(_) => "decimal",
            AnswerValue::Integer(_) => "integer",
            AnswerValue::String(_) => "string",
            AnswerValue::Date(_) => "date",
            AnswerValue::Absent => "absent",
        }
    }

    pub fn as_coding(&self) -> Option<&Coding> {
        match self {
            AnswerValue::Coded(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    values: IndexMap<String, AnswerValue>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: impl Into<String>, value: AnswerValue) {
        self.values.insert(position.into(), value);
    }

    pub fn with(mut self, position: impl Into<String>, value: AnswerValue) -> Self {
        self.insert(position, value);
        self
    }

    /// The submitted value, treating `Absent` like a missing entry.
    pub fn get(&self, position: &str) -> Option<&AnswerValue> {
        self.values.get(position).filter(|v| !v.is_absent())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AnswerValue)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, AnswerValue)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_shape_is_flat_and_tagged() {
        let set = AnswerSet::new()
            .with("1.1", AnswerValue::coded("http://snomed.info/sct", "373066001"))
            .with("1.2", AnswerValue::decimal(72.5))
            .with("1.3", AnswerValue::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()))
            .with("1.4", AnswerValue::Absent);
        let v = serde_json::to_value(&set).unwrap();
        assert_eq!(v["1.1"]["type"], "coded");
        assert_eq!(v["1.1"]["value"]["code"], "373066001");
        assert_eq!(v["1.2"], json!({"type": "decimal", "value": 72.5}));
        assert_eq!(v["1.3"]["value"], "2020-02-29");
        assert_eq!(v["1.4"], json!({"type": "absent"}));

        let back: AnswerSet = serde_json::from_value(v).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn absent_reads_as_missing() {
        let set = AnswerSet::new().with("1", AnswerValue::Absent);
        assert!(set.get("1").is_none());
        assert_eq!(set.len(), 1);
    }
}
