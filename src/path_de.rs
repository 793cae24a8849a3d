use serde::de::DeserializeOwned;

use crate::error::SchemaLoadError;

/// Deserialize a declarative document, reporting the JSON path of the first
/// offending node (e.g. `children[2].variants[0].coding.system`).
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, SchemaLoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        SchemaLoadError::Json(format!("at JSON path {path} → {}", err.into_inner()))
    })
}
