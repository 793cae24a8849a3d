use chrono::NaiveDate;
use indexmap::IndexMap;

use super::{CompositeRenderer, CompositeValue};
use crate::answers::AnswerValue;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::form::{FormItem, ItemKind};
use crate::parse::coerce_scalar;
use crate::schema::{join_path, Coding, Comparator, ScalarType, Variant};

pub const TYPE_ID: &str = "status_date";

const SNOMED: &str = "http://snomed.info/sct";

/// Yes / No / Unknown answer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Yes,
    No,
    Unknown,
}

impl Presence {
    pub const ALL: [Presence; 3] = [Presence::Yes, Presence::No, Presence::Unknown];

    pub fn name(self) -> &'static str {
        match self {
            Presence::Yes => "YES",
            Presence::No => "NO",
            Presence::Unknown => "UNKNOWN",
        }
    }

    pub fn coding(self) -> Coding {
        match self {
            Presence::Yes => Coding::new(SNOMED, "373066001", "Yes"),
            Presence::No => Coding::new(SNOMED, "373067005", "No"),
            Presence::Unknown => Coding::new(SNOMED, "261665006", "Unknown"),
        }
    }

    pub fn from_code(system: &str, code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.coding().same_code(system, code))
    }

    /// Enum variants for a schema field answered with Yes / No / Unknown.
    pub fn variants() -> Vec<Variant> {
        Self::ALL.into_iter().map(|p| Variant::new(p.name(), p.coding())).collect()
    }
}

/// "Did X happen, and if so when": `.status` plus `.date`, the date only
/// relevant when the status is YES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusDate {
    pub status: Option<Presence>,
    pub date: Option<NaiveDate>,
}

impl StatusDate {
    pub fn from_value(value: &CompositeValue) -> Option<Self> {
        if value.type_id != TYPE_ID {
            return None;
        }
        let status = value
            .part("status")
            .and_then(AnswerValue::as_coding)
            .and_then(|c| Presence::from_code(&c.system, &c.code));
        let date = match value.part("date") {
            Some(AnswerValue::Date(d)) => Some(*d),
            _ => None,
        };
        Some(Self { status, date })
    }
}

impl From<StatusDate> for CompositeValue {
    fn from(v: StatusDate) -> Self {
        let mut out = CompositeValue::new(TYPE_ID);
        if let Some(status) = v.status {
            out.insert("status", AnswerValue::Coded(status.coding()));
        }
        if let Some(date) = v.date {
            out.insert("date", AnswerValue::Date(date));
        }
        out
    }
}

pub struct StatusDateRenderer;

impl CompositeRenderer for StatusDateRenderer {
    fn type_id(&self) -> &str {
        TYPE_ID
    }

    fn render(&self, prefix: &str) -> Vec<FormItem> {
        let status_path = join_path(prefix, "status");
        let options = Presence::ALL.into_iter().map(Presence::coding).collect();
        vec![
            FormItem::choice(status_path.clone(), "Status", options),
            FormItem::new(join_path(prefix, "date"), "Date", ItemKind::Date)
                .visible_if(status_path, Comparator::Equals, Presence::Yes.coding()),
        ]
    }

    fn parse(
        &self,
        prefix: &str,
        parts: &IndexMap<String, AnswerValue>,
        diagnostics: &mut Diagnostics,
    ) -> Option<CompositeValue> {
        let mut out = CompositeValue::new(TYPE_ID);
        if let Some(value) = parts.get("status") {
            let path = join_path(prefix, "status");
            match value {
                AnswerValue::Coded(c) => match Presence::from_code(&c.system, &c.code) {
                    Some(p) => out.insert("status", AnswerValue::Coded(p.coding())),
                    None => diagnostics.push(Diagnostic::UnmatchedCode {
                        path,
                        system: c.system.clone(),
                        code: c.code.clone(),
                    }),
                },
                other => diagnostics.push(Diagnostic::TypeMismatch {
                    path,
                    expected: "coded",
                    found: other.label(),
                }),
            }
        }
        if let Some(value) = parts.get("date") {
            match coerce_scalar(&join_path(prefix, "date"), ScalarType::Date, value) {
                Ok(date) => out.insert("date", date),
                Err(d) => diagnostics.push(d),
            }
        }
        (!out.is_empty()).then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::PredicateTarget;

    fn parts(entries: &[(&str, AnswerValue)]) -> IndexMap<String, AnswerValue> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn date_depends_on_sibling_status() {
        let items = StatusDateRenderer.render("history.onset");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].schema_path, "history.onset.status");
        assert_eq!(items[0].answer_options.len(), 3);
        let pred = items[1].visibility.as_ref().unwrap();
        assert_eq!(pred.target, PredicateTarget::SchemaPath("history.onset.status".into()));
        assert_eq!(pred.expected.code, "373066001");
    }

    #[test]
    fn status_only_is_a_partial_value() {
        let mut diags = Diagnostics::new();
        let v = StatusDateRenderer
            .parse("x", &parts(&[("status", AnswerValue::coded(SNOMED, "373066001"))]), &mut diags)
            .unwrap();
        let typed = StatusDate::from_value(&v).unwrap();
        assert_eq!(typed, StatusDate { status: Some(Presence::Yes), date: None });
        assert!(diags.is_empty());
    }

    #[test]
    fn nothing_answered_is_none() {
        let mut diags = Diagnostics::new();
        assert!(StatusDateRenderer.parse("x", &IndexMap::new(), &mut diags).is_none());
    }

    #[test]
    fn bad_parts_are_diagnosed_and_skipped() {
        let mut diags = Diagnostics::new();
        let v = StatusDateRenderer.parse(
            "x",
            &parts(&[
                ("status", AnswerValue::coded(SNOMED, "12345")),
                ("date", AnswerValue::String("2021-13-40".into())),
            ]),
            &mut diags,
        );
        assert!(v.is_none());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn date_from_text_is_accepted() {
        let mut diags = Diagnostics::new();
        let v = StatusDateRenderer
            .parse("x", &parts(&[("date", AnswerValue::String("2021-03-04".into()))]), &mut diags)
            .unwrap();
        assert_eq!(StatusDate::from_value(&v).unwrap().date, NaiveDate::from_ymd_opt(2021, 3, 4));
    }
}
