use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages. `origin` names the
/// source (usually a file path) in the error.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str, origin: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| load_error(err, origin))
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8], origin: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| load_error(err, origin))
}

fn load_error(err: serde_path_to_error::Error<serde_json::Error>, origin: &str) -> Error {
    let path = err.path().to_string();
    Error::SchemaLoad {
        path: origin.to_owned(),
        reason: format!("at JSON path {path} → {}", err.into_inner()),
    }
}
