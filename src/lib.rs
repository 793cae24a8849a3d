//! Bidirectional compiler between a nested clinical data schema and a generic
//! form: schema → form items with stable position ids, and answers keyed by
//! position id → a populated schema instance.
pub mod answers;
pub mod cli;
pub mod composite;
pub mod config;
pub mod demo;
pub mod diagnostics;
pub mod error;
pub mod form;
pub mod instance;
pub mod parse;
pub mod path_de;
pub mod render;
pub mod resolve;
pub mod schema;
pub mod synth;
pub mod wire;

pub use answers::{AnswerSet, AnswerValue};
pub use composite::{CompositeRegistry, CompositeRenderer, CompositeValue};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ConfigError, ParseError, SchemaLoadError};
pub use form::{FormItem, ItemKind};
pub use instance::SchemaInstance;
pub use parse::{AnswerParser, ParseOutcome};
pub use render::FormRenderer;
pub use resolve::{PositionIndex, resolve};
pub use schema::{SchemaNode, SchemaRegistry};
