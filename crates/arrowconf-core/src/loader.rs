//! Loading a configuration file into a resolved tree or a typed struct

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::context::CancelToken;
use crate::error::{Error, Result};
use crate::interpolator::Interpolator;
use crate::source;
use crate::value::Value;

/// Environment variable that replaces the top-level config path
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Pick the path to load: a non-empty override wins over `path`
pub fn resolve_config_path(path: &Path, override_path: Option<&str>) -> PathBuf {
    match override_path {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => path.to_path_buf(),
    }
}

/// The top-level config path after applying `CONFIG_PATH`
pub fn config_path(path: impl AsRef<Path>) -> PathBuf {
    let override_path = std::env::var(CONFIG_PATH_ENV).ok();
    resolve_config_path(path.as_ref(), override_path.as_deref())
}

/// Read a file without interpolating it
pub fn read_value(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    source::read_file(path)
        .map_err(|e| Error::io(format!("file {}", path.display()), e.to_string()))
}

/// Read and interpolate a config file.
///
/// `CONFIG_PATH` overrides `path`. Paths inside `FS->` directives are
/// taken as written.
pub fn load_value(
    path: impl AsRef<Path>,
    interpolator: &Interpolator,
    cancel: &CancelToken,
) -> Result<Value> {
    let path = config_path(path);
    log::debug!("loading config from {}", path.display());

    let raw = read_value(&path)?;
    interpolator.interpolate_with(raw, cancel)
}

/// Read, interpolate and decode a config file into `T`
pub fn load_config<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    interpolator: &Interpolator,
    cancel: &CancelToken,
) -> Result<T> {
    let value = load_value(path, interpolator, cancel)?;
    decode(value)
}

/// Decode a resolved tree into `T`.
///
/// Duration leaves decode into `std::time::Duration` fields.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    let json = serde_json::to_value(&value)
        .map_err(|e| Error::internal(format!("failed to encode value: {}", e)))?;
    serde_json::from_value(json).map_err(|e| {
        Error::parse(format!("failed to decode config: {}", e))
            .with_help("Check that the file's keys and value types match the target struct")
    })
}
