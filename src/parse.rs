//! Answer set → schema instance.
//!
//! The parser trusts the answer set as given: it does not re-evaluate
//! visibility, so an answer to a hidden item is still parsed.
use chrono::NaiveDate;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::answers::{AnswerSet, AnswerValue};
use crate::composite::CompositeRegistry;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ConfigError, ParseError};
use crate::form::{FormItem, ItemKind};
use crate::instance::{SchemaInstance, Value};
use crate::render::scalar_item_kind;
use crate::schema::{ScalarType, SchemaKind, SchemaNode, SchemaRegistry};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Best-effort result: everything that was present, resolvable and
/// type-correct, plus a record of what was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub instance: SchemaInstance,
    pub diagnostics: Diagnostics,
}

/// Sub-answers of one composite value, keyed by suffix.
struct PendingComposite {
    type_id: String,
    parts: IndexMap<String, AnswerValue>,
}

pub struct AnswerParser<'a> {
    schema: &'a SchemaRegistry,
    composites: &'a CompositeRegistry,
}

impl<'a> AnswerParser<'a> {
    pub fn new(schema: &'a SchemaRegistry, composites: &'a CompositeRegistry) -> Self {
        Self { schema, composites }
    }

    /// Rebuild a schema instance from a resolved form and its answers.
    ///
    /// Per-answer problems are diagnostics. Errors are reserved for a form
    /// that does not belong to this schema.
    pub fn parse(&self, form: &FormItem, answers: &AnswerSet) -> Result<ParseOutcome, ParseError> {
        let mut diagnostics = Diagnostics::new();
        let mut instance = SchemaInstance::new();

        let by_position: IndexMap<&str, &FormItem> = form
            .iter()
            .filter_map(|item| item.position_id.as_deref().map(|pos| (pos, item)))
            .collect();

        let mut pending: IndexMap<String, PendingComposite> = IndexMap::new();
        let mut written = 0usize;

        for (position, value) in answers.iter() {
            if value.is_absent() {
                continue;
            }
            let Some(item) = by_position.get(position) else {
                diagnostics.push(Diagnostic::UnknownPosition { position: position.to_string() });
                continue;
            };
            if !item.kind.is_leaf() {
                diagnostics.push(Diagnostic::AnswerOnGroup { path: item.schema_path.clone() });
                continue;
            }
            if let Some(part) = &item.composite {
                pending
                    .entry(part.prefix.clone())
                    .or_insert_with(|| PendingComposite { type_id: part.type_id.clone(), parts: IndexMap::new() })
                    .parts
                    .insert(part.suffix.clone(), value.clone());
                continue;
            }

            let node = self
                .schema
                .node(&item.schema_path)
                .ok_or_else(|| ParseError::UnknownField(item.schema_path.clone()))?;
            match self.convert(item, node, value)? {
                Ok(v) => {
                    instance.set(self.schema, &item.schema_path, v)?;
                    written += 1;
                }
                Err(d) => diagnostics.push(d),
            }
        }

        for (prefix, group) in pending {
            let renderer = self.composites.get(&group.type_id).ok_or_else(|| {
                ConfigError::MissingCompositeRenderer { path: prefix.clone(), type_id: group.type_id.clone() }
            })?;
            if let Some(value) = renderer.parse(&prefix, &group.parts, &mut diagnostics) {
                instance.set(self.schema, &prefix, Value::Composite(value))?;
                written += 1;
            }
        }

        tracing::debug!(answers = answers.len(), written, skipped = diagnostics.len(), "answers parsed");
        Ok(ParseOutcome { instance, diagnostics })
    }

    /// Outer error: the item and the schema disagree (fatal).
    /// Inner error: this answer cannot be used (diagnostic).
    fn convert(
        &self,
        item: &FormItem,
        node: &SchemaNode,
        value: &AnswerValue,
    ) -> Result<Result<Value, Diagnostic>, ParseError> {
        let path = &item.schema_path;
        let converted = match &node.kind {
            SchemaKind::Enum { .. } if item.kind == ItemKind::Choice => match value {
                AnswerValue::Coded(c) => match node.variant_for(&c.system, &c.code) {
                    Some(variant) => Ok(Value::Choice(variant.name.clone())),
                    None => Err(Diagnostic::UnmatchedCode {
                        path: path.clone(),
                        system: c.system.clone(),
                        code: c.code.clone(),
                    }),
                },
                other => Err(Diagnostic::TypeMismatch { path: path.clone(), expected: "coded", found: other.label() }),
            },
            SchemaKind::Scalar { ty } if item.kind == scalar_item_kind(*ty) => {
                coerce_scalar(path, *ty, value).and_then(|v| {
                    Value::try_from(v).map_err(|v| Diagnostic::TypeMismatch {
                        path: path.clone(),
                        expected: item.kind.label(),
                        found: v.label(),
                    })
                })
            }
            other => {
                return Err(ParseError::KindMismatch {
                    path: path.clone(),
                    declared: other.label(),
                    written: item.kind.label(),
                });
            }
        };
        Ok(converted)
    }
}

/// Convert a submitted value to the declared scalar type.
///
/// Widening is allowed (integer → decimal, whole decimal → integer) and
/// textual numbers and `YYYY-MM-DD` dates are parsed; anything else is a
/// diagnostic for `path`.
pub fn coerce_scalar(path: &str, ty: ScalarType, value: &AnswerValue) -> Result<AnswerValue, Diagnostic> {
    let invalid = |raw: &str, reason: String| Diagnostic::InvalidValue {
        path: path.to_string(),
        raw: raw.to_string(),
        reason,
    };
    let mismatch = || Diagnostic::TypeMismatch {
        path: path.to_string(),
        expected: scalar_item_kind(ty).label(),
        found: value.label(),
    };

    match (ty, value) {
        (ScalarType::Integer, AnswerValue::Integer(i)) => Ok(AnswerValue::Integer(*i)),
        (ScalarType::Integer, AnswerValue::Decimal(d)) => {
            let f = d.0;
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            if !f.is_finite() || f.fract() != 0.0 {
                Err(invalid(&f.to_string(), "not a whole number".into()))
            } else if f < i64::MIN as f64 || f >= i64::MAX as f64 {
                Err(invalid(&f.to_string(), "out of integer range".into()))
            } else {
                Ok(AnswerValue::Integer(f as i64))
            }
        }
        (ScalarType::Integer, AnswerValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(AnswerValue::Integer)
            .map_err(|e| invalid(s, e.to_string())),

        (ScalarType::Decimal, AnswerValue::Decimal(d)) => Ok(AnswerValue::Decimal(*d)),
        (ScalarType::Decimal, AnswerValue::Integer(i)) => Ok(AnswerValue::Decimal(OrderedFloat(*i as f64))),
        (ScalarType::Decimal, AnswerValue::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(AnswerValue::decimal(f)),
            Ok(_) => Err(invalid(s, "not a finite number".into())),
            Err(e) => Err(invalid(s, e.to_string())),
        },

        (ScalarType::String, AnswerValue::String(s)) => Ok(AnswerValue::String(s.clone())),

        (ScalarType::Date, AnswerValue::Date(d)) => Ok(AnswerValue::Date(*d)),
        (ScalarType::Date, AnswerValue::String(s)) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(AnswerValue::Date)
            .map_err(|e| invalid(s, e.to_string())),

        _ => Err(mismatch()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
