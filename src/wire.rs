//! JSON codec for the outside world: forms go out as questionnaire
//! documents, filled-in responses come back as nested item trees.
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::answers::{AnswerSet, AnswerValue};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::SchemaLoadError;
use crate::form::{FormItem, ItemKind, PredicateTarget};
use crate::parse::DATE_FORMAT;
use crate::path_de::from_str_with_path;
use crate::schema::{Coding, Comparator};

pub const PROFILE_EXTENSION: &str = "http://schemaform.dev/fhir/StructureDefinition/profile";
pub const UNIT_EXTENSION: &str = "http://hl7.org/fhir/StructureDefinition/questionnaire-unit";
pub const ITEM_CONTROL_EXTENSION: &str = "http://hl7.org/fhir/StructureDefinition/questionnaire-itemControl";
const ITEM_CONTROL_SYSTEM: &str = "http://hl7.org/fhir/questionnaire-item-control";

fn item_type(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Group => "group",
        ItemKind::Choice => "choice",
        ItemKind::Decimal => "decimal",
        ItemKind::Integer => "integer",
        ItemKind::Date => "date",
        ItemKind::String => "string",
    }
}

fn coding_json(c: &Coding) -> Value {
    let mut o = json!({ "system": c.system, "code": c.code });
    if !c.display.is_empty() {
        o["display"] = Value::from(c.display.clone());
    }
    o
}

/// Questionnaire document for a resolved form. The root group is kept as
/// the single top-level item so every position id appears as a `linkId`.
pub fn form_to_json(form: &FormItem) -> Value {
    json!({
        "resourceType": "Questionnaire",
        "status": "draft",
        "title": form.display_text,
        "item": [item_to_json(form)],
    })
}

fn item_to_json(item: &FormItem) -> Value {
    let link_id = item.position_id.as_deref().unwrap_or(&item.schema_path);
    let mut o = json!({
        "linkId": link_id,
        "definition": item.schema_path,
        "text": item.display_text,
        "type": item_type(item.kind),
    });

    let mut extensions = Vec::new();
    if let Some(profile) = &item.metadata.profile {
        extensions.push(json!({ "url": PROFILE_EXTENSION, "valueCanonical": profile }));
    }
    if let Some(unit) = &item.metadata.unit {
        extensions.push(json!({ "url": UNIT_EXTENSION, "valueCoding": coding_json(unit) }));
    }
    if item.metadata.combo_box {
        extensions.push(json!({
            "url": ITEM_CONTROL_EXTENSION,
            "valueCodeableConcept": { "coding": [{ "system": ITEM_CONTROL_SYSTEM, "code": "drop-down" }] },
        }));
    }
    if !extensions.is_empty() {
        o["extension"] = Value::Array(extensions);
    }

    if let Some(pred) = &item.visibility {
        // unresolved predicates have no linkId to point at
        if let PredicateTarget::Position(question) = &pred.target {
            let operator = match pred.comparator {
                Comparator::Equals => "=",
                Comparator::NotEquals => "!=",
            };
            o["enableWhen"] = json!([{
                "question": question,
                "operator": operator,
                "answerCoding": coding_json(&pred.expected),
            }]);
        }
    }
    if !item.answer_options.is_empty() {
        o["answerOption"] = item
            .answer_options
            .iter()
            .map(|c| json!({ "valueCoding": coding_json(c) }))
            .collect();
    }
    if !item.children.is_empty() {
        o["item"] = item.children.iter().map(item_to_json).collect();
    }
    o
}

// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    item: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseItem {
    link_id: String,
    #[serde(default)]
    answer: Vec<ResponseAnswer>,
    #[serde(default)]
    item: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseAnswer {
    value_coding: Option<Coding>,
    value_decimal: Option<f64>,
    value_integer: Option<i64>,
    value_date: Option<String>,
    value_string: Option<String>,
    #[serde(default)]
    item: Vec<ResponseItem>,
}

impl ResponseAnswer {
    fn value(&self) -> Option<AnswerValue> {
        if let Some(c) = &self.value_coding {
            return Some(AnswerValue::Coded(c.clone()));
        }
        if let Some(d) = self.value_decimal {
            return Some(AnswerValue::decimal(d));
        }
        if let Some(i) = self.value_integer {
            return Some(AnswerValue::Integer(i));
        }
        if let Some(raw) = &self.value_date {
            // left as text so the parser reports it against the field
            return Some(match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(d) => AnswerValue::Date(d),
                Err(_) => AnswerValue::String(raw.clone()),
            });
        }
        self.value_string.clone().map(AnswerValue::String)
    }
}

/// Answers read from a response document, plus the answers that could not
/// be carried over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseAnswers {
    pub answers: AnswerSet,
    pub diagnostics: Diagnostics,
}

/// Flatten a response document into an answer set keyed by `linkId`.
///
/// Only the first answer of an item is kept. Items without a usable answer
/// are left out; both cases are reported. Children are read whether they
/// hang off the item or off its answer.
pub fn answers_from_response(src: &str) -> Result<ResponseAnswers, SchemaLoadError> {
    let response: Response = from_str_with_path(src)?;
    let mut out = ResponseAnswers::default();
    collect(&response.item, &mut out);
    Ok(out)
}

fn collect(items: &[ResponseItem], out: &mut ResponseAnswers) {
    for item in items {
        if item.answer.len() > 1 {
            out.diagnostics.push(Diagnostic::ExtraAnswers {
                position: item.link_id.clone(),
                ignored: item.answer.len() - 1,
            });
        }
        match item.answer.first().and_then(ResponseAnswer::value) {
            Some(value) => out.answers.insert(item.link_id.clone(), value),
            None if !item.answer.is_empty() => {
                out.diagnostics.push(Diagnostic::UnsupportedAnswer { position: item.link_id.clone() });
            }
            None => {}
        }
        for answer in &item.answer {
            collect(&answer.item, out);
        }
        collect(&item.item, out);
    }
}
