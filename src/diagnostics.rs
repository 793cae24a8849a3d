//! Recorded-and-skipped problems. Every entry is also logged through `tracing`.
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("`{item}` depends on `{depends_on}` which is not in the form; predicate dropped")]
    DanglingDependency { item: String, depends_on: String },

    #[error("answer for position `{position}` matches no form item")]
    UnknownPosition { position: String },

    #[error("answer for `{path}` targets a group, not a question")]
    AnswerOnGroup { path: String },

    #[error("`{path}`: ({system}, {code}) is not one of the declared codes")]
    UnmatchedCode { path: String, system: String, code: String },

    #[error("`{path}`: expected a {expected} answer, got {found}")]
    TypeMismatch { path: String, expected: &'static str, found: &'static str },

    #[error("`{path}`: cannot convert `{raw}` ({reason})")]
    InvalidValue { path: String, raw: String, reason: String },

    #[error("response item `{position}` carries no supported answer value")]
    UnsupportedAnswer { position: String },

    #[error("response item `{position}`: {ignored} extra answer(s) ignored, only the first is read")]
    ExtraAnswers { position: String, ignored: usize },
}

/// Sink for diagnostics of one render/resolve/parse run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(kind = diagnostic.kind(), "{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::DanglingDependency { .. } => "dangling_dependency",
            Diagnostic::UnknownPosition { .. } => "unknown_position",
            Diagnostic::AnswerOnGroup { .. } => "answer_on_group",
            Diagnostic::UnmatchedCode { .. } => "unmatched_code",
            Diagnostic::TypeMismatch { .. } => "type_mismatch",
            Diagnostic::InvalidValue { .. } => "invalid_value",
            Diagnostic::UnsupportedAnswer { .. } => "unsupported_answer",
            Diagnostic::ExtraAnswers { .. } => "extra_answers",
        }
    }
}
