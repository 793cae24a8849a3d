use indexmap::IndexMap;

use super::{CompositeRenderer, CompositeValue};
use crate::answers::AnswerValue;
use crate::diagnostics::Diagnostics;
use crate::form::{FormItem, ItemKind};
use crate::parse::coerce_scalar;
use crate::schema::{join_path, ScalarType};

pub const TYPE_ID: &str = "quantity";

/// Measured value with a free-text (or UCUM) unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Quantity {
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl Quantity {
    pub fn from_value(value: &CompositeValue) -> Option<Self> {
        if value.type_id != TYPE_ID {
            return None;
        }
        let number = match value.part("value") {
            Some(AnswerValue::Decimal(d)) => Some(d.0),
            _ => None,
        };
        let unit = match value.part("unit") {
            Some(AnswerValue::String(s)) => Some(s.clone()),
            _ => None,
        };
        Some(Self { value: number, unit })
    }
}

impl From<Quantity> for CompositeValue {
    fn from(q: Quantity) -> Self {
        let mut out = CompositeValue::new(TYPE_ID);
        if let Some(v) = q.value {
            out.insert("value", AnswerValue::decimal(v));
        }
        if let Some(u) = q.unit {
            out.insert("unit", AnswerValue::String(u));
        }
        out
    }
}

pub struct QuantityRenderer;

impl CompositeRenderer for QuantityRenderer {
    fn type_id(&self) -> &str {
        TYPE_ID
    }

    fn render(&self, prefix: &str) -> Vec<FormItem> {
        vec![
            FormItem::new(join_path(prefix, "value"), "Value", ItemKind::Decimal),
            FormItem::new(join_path(prefix, "unit"), "Unit", ItemKind::String),
        ]
    }

    fn parse(
        &self,
        prefix: &str,
        parts: &IndexMap<String, AnswerValue>,
        diagnostics: &mut Diagnostics,
    ) -> Option<CompositeValue> {
        let mut out = CompositeValue::new(TYPE_ID);
        if let Some(v) = parts.get("value") {
            match coerce_scalar(&join_path(prefix, "value"), ScalarType::Decimal, v) {
                Ok(v) => out.insert("value", v),
                Err(d) => diagnostics.push(d),
            }
        }
        // a coded unit keeps only its code
        let unit = match parts.get("unit") {
            Some(AnswerValue::Coded(c)) => Some(AnswerValue::String(c.code.clone())),
            other => other.cloned(),
        };
        if let Some(u) = unit {
            match coerce_scalar(&join_path(prefix, "unit"), ScalarType::String, &u) {
                Ok(u) => out.insert("unit", u),
                Err(d) => diagnostics.push(d),
            }
        }
        (!out.is_empty()).then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_value_widens_and_coded_unit_keeps_code() {
        let parts: IndexMap<String, AnswerValue> = [
            ("value".to_string(), AnswerValue::Integer(80)),
            ("unit".to_string(), AnswerValue::coded("http://unitsofmeasure.org", "kg")),
        ]
        .into_iter()
        .collect();
        let mut diags = Diagnostics::new();
        let v = QuantityRenderer.parse("weight", &parts, &mut diags).unwrap();
        assert_eq!(Quantity::from_value(&v).unwrap(), Quantity { value: Some(80.0), unit: Some("kg".into()) });
        assert!(diags.is_empty());
    }

    #[test]
    fn typed_view_rejects_other_composites() {
        let other = CompositeValue::new("status_date");
        assert!(Quantity::from_value(&other).is_none());
    }
}
