//! Fatal error types. Recoverable, per-field problems are not errors; they go
//! through [`crate::diagnostics::Diagnostics`] instead.
use thiserror::Error;

/// Schema or registry configuration that can never render or parse correctly.
/// Raised at registry-build or render-start time, before any item is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("model root `{name}` must be a composite, found {kind}")]
    RootNotComposite { name: String, kind: &'static str },

    #[error("duplicate schema path `{0}`")]
    DuplicatePath(String),

    #[error("enum `{path}` declares ({system}, {code}) more than once")]
    DuplicateEnumCode { path: String, system: String, code: String },

    #[error("enum `{0}` has no variants")]
    EmptyEnum(String),

    #[error("invalid field name `{name}` under `{parent}` (expected an identifier)")]
    InvalidFieldName { parent: String, name: String },

    #[error("no composite renderer registered for type `{type_id}` (used by `{path}`)")]
    MissingCompositeRenderer { path: String, type_id: String },

    #[error("composite renderer `{0}` registered twice")]
    DuplicateCompositeRenderer(String),
}

/// Renderer, parser and registry disagree about the shape of the model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("schema has no field at `{0}`")]
    UnknownField(String),

    #[error("field `{path}` is declared as {declared} but was written as {written}")]
    KindMismatch {
        path: String,
        declared: &'static str,
        written: &'static str,
    },

    #[error("enum `{path}` has no variant named `{variant}`")]
    UnknownVariant { path: String, variant: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failure to read a declarative document (schema, answers, response).
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    /// Deserialization failed; message carries the JSON path.
    #[error("{0}")]
    Json(String),

    #[error("failed to read {}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
