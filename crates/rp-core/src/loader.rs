//! Package manifest and configuration file loading.
//!
//! Both loaders are best-effort: a missing or unreadable file yields an empty
//! JSON object so resolution can continue with defaults.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::config::UserConfig;
use crate::error::ConfigError;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = ".buildrc.json";

/// Name of the package manifest.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Returns the closest directory at or above `start` that holds a package manifest.
#[must_use]
pub fn closest_package_dir(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
        .map(Utf8Path::to_path_buf)
}

/// Reads the closest package manifest as JSON.
///
/// Never fails: any problem yields an empty object.
#[must_use]
pub fn read_package_manifest(start: &Utf8Path) -> Value {
    let Some(dir) = closest_package_dir(start) else {
        return empty_object();
    };
    read_json_object(&dir.join(MANIFEST_FILE_NAME))
}

/// Reads a configuration document.
///
/// Returns an empty object if the file is absent, unreadable, or not a JSON
/// object. Absence is only a signal to use defaults.
#[must_use]
pub fn load_config_value(path: &Utf8Path) -> Value {
    if !path.exists() {
        tracing::debug!(path = %path, "No configuration file, using defaults");
        return empty_object();
    }
    read_json_object(path)
}

/// Loads and deserializes a user configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the document is valid JSON but its values
/// have the wrong shape.
pub fn load_user_config(path: &Utf8Path) -> Result<UserConfig, ConfigError> {
    UserConfig::from_value(load_config_value(path))
}

fn read_json_object(path: &Utf8Path) -> Value {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to read file");
            return empty_object();
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            tracing::warn!(path = %path, "Expected a JSON object, ignoring file");
            empty_object()
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to parse JSON, ignoring file");
            empty_object()
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
