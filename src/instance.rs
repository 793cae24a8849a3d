//! Populated schema instance: a nested record mirroring the schema, with
//! every field optional.
use chrono::NaiveDate;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::answers::AnswerValue;
use crate::composite::CompositeValue;
use crate::error::ParseError;
use crate::schema::{ScalarType, SchemaKind, SchemaRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Group(Record),
    /// Enum field, holding the variant name.
    Choice(String),
    Integer(i64),
    Decimal(OrderedFloat<f64>),
    String(String),
    Date(NaiveDate),
    Composite(CompositeValue),
}

impl Value {
    pub fn label(&self) -> &'static str {
        match self {
            Value::Group(_) => "composite",
            Value::Choice(_) => "enum",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Composite(_) => "composite value",
        }
    }
}

/// Scalar answers convert directly; coded and absent answers are handed back.
impl TryFrom<AnswerValue> for Value {
    type Error = AnswerValue;

    fn try_from(answer: AnswerValue) -> Result<Self, Self::Error> {
        match answer {
            AnswerValue::Integer(i) => Ok(Value::Integer(i)),
            AnswerValue::Decimal(d) => Ok(Value::Decimal(d)),
            AnswerValue::String(s) => Ok(Value::String(s)),
            AnswerValue::Date(d) => Ok(Value::Date(d)),
            other @ (AnswerValue::Coded(_) | AnswerValue::Absent) => Err(other),
        }
    }
}

/// Field name → value. Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaInstance {
    root: Record,
}

impl SchemaInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Record {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.root.get(segments.next()?)?;
        for segment in segments {
            match value {
                Value::Group(record) => value = record.get(segment)?,
                _ => return None,
            }
        }
        Some(value)
    }

    /// Write `value` at `path`, creating enclosing records on the way.
    ///
    /// The path must name a declared field and the value must fit its kind;
    /// anything else means the form and the schema are out of sync.
    pub fn set(&mut self, schema: &SchemaRegistry, path: &str, value: Value) -> Result<(), ParseError> {
        let node = schema
            .node(path)
            .filter(|_| !path.is_empty())
            .ok_or_else(|| ParseError::UnknownField(path.to_string()))?;

        let fits = match (&node.kind, &value) {
            (SchemaKind::Composite { .. }, Value::Group(_)) => true,
            (SchemaKind::Enum { .. }, Value::Choice(name)) => {
                if node.variant_named(name).is_none() {
                    return Err(ParseError::UnknownVariant { path: path.to_string(), variant: name.clone() });
                }
                true
            }
            (SchemaKind::CompositeValue { type_id }, Value::Composite(v)) => *type_id == v.type_id,
            (SchemaKind::Scalar { ty }, v) => matches!(
                (ty, v),
                (ScalarType::Integer, Value::Integer(_))
                    | (ScalarType::Decimal, Value::Decimal(_))
                    | (ScalarType::String, Value::String(_))
                    | (ScalarType::Date, Value::Date(_))
            ),
            _ => false,
        };
        if !fits {
            return Err(ParseError::KindMismatch {
                path: path.to_string(),
                declared: node.kind.label(),
                written: value.label(),
            });
        }

        let mut record = &mut self.root;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                record.fields.insert(segment.to_string(), value);
                return Ok(());
            }
            let slot = record
                .fields
                .entry(segment.to_string())
                .or_insert_with(|| Value::Group(Record::default()));
            record = match slot {
                Value::Group(inner) => inner,
                other => {
                    return Err(ParseError::KindMismatch {
                        path: path.to_string(),
                        declared: "composite",
                        written: other.label(),
                    });
                }
            };
        }
        Ok(())
    }
}
