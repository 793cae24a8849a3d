//! Run settings, resolved once at startup from the command line (and its
//! environment fallbacks) and passed down. Library code never reads the
//! environment itself.
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::SchemaLoadError;
use crate::schema::{SchemaRegistry, load_json};
use crate::synth::HiddenPolicy;

pub const DEFAULT_LOG_FILTER: &str = "schemaform=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// The built-in clinical history model.
    Demo,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Settings {
    schema: SchemaSource,
    hidden_policy: HiddenPolicy,
    log_filter: Option<String>,
    pretty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { schema: SchemaSource::Demo, hidden_policy: HiddenPolicy::default(), log_filter: None, pretty: true }
    }
}

impl Settings {
    pub fn new(schema: Option<PathBuf>, hidden_policy: HiddenPolicy, log_filter: Option<String>, pretty: bool) -> Self {
        let schema = schema.map_or(SchemaSource::Demo, SchemaSource::File);
        // an empty filter means "not set"
        let log_filter = log_filter.filter(|f| !f.trim().is_empty());
        Self { schema, hidden_policy, log_filter, pretty }
    }

    pub fn schema_source(&self) -> &SchemaSource {
        &self.schema
    }

    pub fn hidden_policy(&self) -> HiddenPolicy {
        self.hidden_policy
    }

    /// Explicit filter directive, if one was given. Callers fall back to
    /// `RUST_LOG` and then [`DEFAULT_LOG_FILTER`].
    pub fn log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref()
    }

    pub fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn load_schema(&self) -> Result<SchemaRegistry, SchemaLoadError> {
        match &self.schema {
            SchemaSource::Demo => Ok(crate::demo::registry()?),
            SchemaSource::File(path) => load_schema_file(path),
        }
    }

    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String> {
        if self.pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) }
    }
}

fn load_schema_file(path: &Path) -> Result<SchemaRegistry, SchemaLoadError> {
    let src = std::fs::read_to_string(path)
        .map_err(|source| SchemaLoadError::Io { path: path.to_path_buf(), source })?;
    let registry = load_json(&src)?;
    tracing::info!(path = %path.display(), fields = registry.paths().count(), "schema loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_demo_schema() {
        let settings = Settings::new(None, HiddenPolicy::Fill, Some("  ".into()), false);
        assert_eq!(settings.schema_source(), &SchemaSource::Demo);
        assert_eq!(settings.log_filter(), None);
        assert!(settings.load_schema().unwrap().contains("vitals.height"));
        assert_eq!(settings.to_json(&serde_json::json!({"a": 1})).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn schema_file_is_loaded_and_validated() {
        let dir = std::env::temp_dir().join(format!("schemaform-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schema.json");
        std::fs::write(&path, serde_json::to_string(&crate::demo::schema()).unwrap()).unwrap();

        let settings = Settings::new(Some(path.clone()), HiddenPolicy::Skip, None, true);
        assert!(settings.load_schema().unwrap().contains("details.severity"));

        let missing = Settings::new(Some(dir.join("missing.json")), HiddenPolicy::Skip, None, true);
        assert!(matches!(missing.load_schema(), Err(SchemaLoadError::Io { .. })));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
