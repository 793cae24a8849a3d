//! Answer set generation: canned answers for every leaf of a form, and the
//! inverse of parsing (instance → answers).
use chrono::NaiveDate;

use crate::answers::{AnswerSet, AnswerValue};
use crate::form::{FormItem, ItemKind, PredicateTarget, VisibilityPredicate};
use crate::instance::{SchemaInstance, Value};
use crate::schema::SchemaRegistry;

/// What to do with items whose visibility predicate is false given the
/// answers generated so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum HiddenPolicy {
    /// Answer every leaf, hidden or not.
    #[default]
    Fill,
    /// Leave hidden items and their descendants unanswered.
    Skip,
}

/// Whether `pred` holds against `answers`. A predicate that still targets a
/// schema path has not been resolved and is not evaluated.
pub fn predicate_holds(pred: &VisibilityPredicate, answers: &AnswerSet) -> bool {
    let PredicateTarget::Position(position) = &pred.target else {
        return true;
    };
    let matched = answers
        .get(position)
        .and_then(AnswerValue::as_coding)
        .is_some_and(|c| c.same_code(&pred.expected.system, &pred.expected.code));
    pred.comparator.holds(matched)
}

pub fn is_visible(item: &FormItem, answers: &AnswerSet) -> bool {
    item.visibility.as_ref().is_none_or(|pred| predicate_holds(pred, answers))
}

pub struct Synthesizer {
    policy: HiddenPolicy,
    date: NaiveDate,
}

impl Synthesizer {
    pub fn new(policy: HiddenPolicy) -> Self {
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN);
        Self { policy, date }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// One canned answer per leaf of a resolved form, in pre-order. Choices
    /// take their first option. Items without a position id are skipped.
    pub fn synthesize(&self, form: &FormItem) -> AnswerSet {
        let mut answers = AnswerSet::new();
        self.visit(form, &mut answers);
        tracing::debug!(answers = answers.len(), policy = ?self.policy, "answers synthesized");
        answers
    }

    fn visit(&self, item: &FormItem, answers: &mut AnswerSet) {
        if self.policy == HiddenPolicy::Skip && !is_visible(item, answers) {
            return;
        }
        if let (Some(position), Some(value)) = (&item.position_id, self.sample(item)) {
            answers.insert(position.clone(), value);
        }
        for child in &item.children {
            self.visit(child, answers);
        }
    }

    fn sample(&self, item: &FormItem) -> Option<AnswerValue> {
        match item.kind {
            ItemKind::Group => None,
            ItemKind::Choice => item.answer_options.first().cloned().map(AnswerValue::Coded),
            ItemKind::Integer => Some(AnswerValue::Integer(1)),
            ItemKind::Decimal => Some(AnswerValue::decimal(1.0)),
            ItemKind::String => Some(AnswerValue::String("text".to_string())),
            ItemKind::Date => Some(AnswerValue::Date(self.date)),
        }
    }
}

/// Answers that parse back to `instance` under `form`.
///
/// Enum fields are written as the variant's coding; composite values are
/// split back into their parts by suffix. Fields with no leaf in the form
/// (ignored fields) are dropped.
pub fn encode_instance(schema: &SchemaRegistry, form: &FormItem, instance: &SchemaInstance) -> AnswerSet {
    let mut answers = AnswerSet::new();
    for item in form.iter().filter(|item| item.kind.is_leaf()) {
        let Some(position) = &item.position_id else { continue };
        let encoded = match &item.composite {
            Some(part) => match instance.get(&part.prefix) {
                Some(Value::Composite(value)) => value.part(&part.suffix).cloned(),
                _ => None,
            },
            None => instance.get(&item.schema_path).and_then(|value| encode_value(schema, &item.schema_path, value)),
        };
        if let Some(value) = encoded {
            answers.insert(position.clone(), value);
        }
    }
    answers
}

fn encode_value(schema: &SchemaRegistry, path: &str, value: &Value) -> Option<AnswerValue> {
    match value {
        Value::Choice(name) => {
            let variant = schema.node(path)?.variant_named(name)?;
            Some(AnswerValue::Coded(variant.coding.clone()))
        }
        Value::Integer(i) => Some(AnswerValue::Integer(*i)),
        Value::Decimal(d) => Some(AnswerValue::Decimal(*d)),
        Value::String(s) => Some(AnswerValue::String(s.clone())),
        Value::Date(d) => Some(AnswerValue::Date(*d)),
        Value::Group(_) | Value::Composite(_) => None,
    }
}
