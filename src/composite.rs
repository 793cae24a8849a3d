//! Pluggable encoders/decoders for values that span several form items.
//!
//! A schema field of kind `CompositeValue { type_id }` is rendered by the
//! renderer registered under `type_id`, and its sub-answers are handed back
//! to the same renderer, grouped by suffix, when parsing.
pub mod quantity;
pub mod status_date;

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::answers::AnswerValue;
use crate::diagnostics::Diagnostics;
use crate::error::ConfigError;
use crate::form::FormItem;

pub use quantity::{Quantity, QuantityRenderer};
pub use status_date::{Presence, StatusDate, StatusDateRenderer};

/// A parsed composite: its type id plus whichever parts were answered,
/// keyed by suffix. Never empty; an all-absent composite parses to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeValue {
    #[serde(rename = "type")]
    pub type_id: String,
    pub parts: IndexMap<String, AnswerValue>,
}

impl CompositeValue {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self { type_id: type_id.into(), parts: IndexMap::new() }
    }

    pub fn insert(&mut self, suffix: impl Into<String>, value: AnswerValue) {
        self.parts.insert(suffix.into(), value);
    }

    pub fn part(&self, suffix: &str) -> Option<&AnswerValue> {
        self.parts.get(suffix)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

pub trait CompositeRenderer: Send + Sync {
    fn type_id(&self) -> &str;

    /// Sub-items for a composite rooted at `prefix`, in display order. Each
    /// item's schema path is `prefix.<suffix>`; predicates may point at a
    /// sibling's schema path.
    fn render(&self, prefix: &str) -> Vec<FormItem>;

    /// Rebuild the value from the answered parts (`suffix -> value`).
    /// Returns `None` when nothing usable was answered; keeps whatever subset
    /// was.
    fn parse(
        &self,
        prefix: &str,
        parts: &IndexMap<String, AnswerValue>,
        diagnostics: &mut Diagnostics,
    ) -> Option<CompositeValue>;
}

/// Type id → renderer. Built once at startup, read-only afterwards.
#[derive(Default)]
pub struct CompositeRegistry {
    renderers: IndexMap<String, Box<dyn CompositeRenderer>>,
}

impl CompositeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `status_date` and `quantity`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.renderers.insert(status_date::TYPE_ID.to_string(), Box::new(StatusDateRenderer));
        registry.renderers.insert(quantity::TYPE_ID.to_string(), Box::new(QuantityRenderer));
        registry
    }

    pub fn register<R: CompositeRenderer + 'static>(&mut self, renderer: R) -> Result<(), ConfigError> {
        let type_id = renderer.type_id().to_string();
        if self.renderers.contains_key(&type_id) {
            return Err(ConfigError::DuplicateCompositeRenderer(type_id));
        }
        self.renderers.insert(type_id, Box::new(renderer));
        Ok(())
    }

    pub fn get(&self, type_id: &str) -> Option<&dyn CompositeRenderer> {
        self.renderers.get(type_id).map(|r| r.as_ref())
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.renderers.contains_key(type_id)
    }
}

impl fmt::Debug for CompositeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.renderers.keys()).finish()
    }
}
