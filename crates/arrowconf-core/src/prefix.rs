//! Built-in prefix resolvers
//!
//! | Prefix    | Payload          | Result                                   |
//! |-----------|------------------|------------------------------------------|
//! | `ENV->`   | variable name    | value; MissingInput if unset or empty    |
//! | `OENV->`  | variable name    | value, or `""` if unset                  |
//! | `FS->`    | file path        | decoded file; Io on any failure          |
//! | `OFS->`   | file path        | decoded file, or null if it is missing   |
//! | `VAULT->` | `[/mount/]path`  | secret data mapping                      |

use std::path::Path;

use crate::context::ResolveContext;
use crate::error::{Error, Result};
use crate::resolver::{RegistryBuilder, ResolvedValue};
use crate::secret::SecretRef;
use crate::source::{self, SourceError};
use crate::value::Value;

/// Required environment variable
pub const ENV: &str = "ENV->";
/// Optional environment variable
pub const OENV: &str = "OENV->";
/// Required file
pub const FS: &str = "FS->";
/// Optional file
pub const OFS: &str = "OFS->";
/// Secret store entry
pub const VAULT: &str = "VAULT->";

pub(crate) fn register_builtins(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .prefix_fn(ENV, env_resolver)
        .prefix_fn(OENV, optional_env_resolver)
        .prefix_fn(FS, file_resolver)
        .prefix_fn(OFS, optional_file_resolver)
        .prefix_fn(VAULT, vault_resolver)
}

fn env_source(name: &str) -> String {
    format!("env:{}", name)
}

fn lookup_env(name: &str) -> Option<String> {
    std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
}

fn env_resolver(name: &str, _ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
    match lookup_env(name) {
        Some(value) if !value.is_empty() => {
            Ok(ResolvedValue::from_source(value, env_source(name)))
        }
        _ => Err(Error::missing_env(name)),
    }
}

fn optional_env_resolver(name: &str, _ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
    let value = lookup_env(name).unwrap_or_default();
    Ok(ResolvedValue::from_source(value, env_source(name)))
}

fn file_source(path: &str) -> String {
    let display = std::fs::canonicalize(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.to_string());
    format!("file:{}", display)
}

fn read_file(path: &str) -> std::result::Result<Value, SourceError> {
    log::trace!("reading {}", path);
    source::read_file(Path::new(path))
}

fn file_io_error(path: &str, err: SourceError) -> Error {
    Error::io(format!("file {}", path), err.to_string())
}

fn file_resolver(path: &str, ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
    ctx.cancel.check()?;
    let value = read_file(path).map_err(|e| file_io_error(path, e))?;
    Ok(ResolvedValue::from_source(value, file_source(path)))
}

fn optional_file_resolver(path: &str, ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
    ctx.cancel.check()?;
    match read_file(path) {
        Ok(value) => Ok(ResolvedValue::from_source(value, file_source(path))),
        Err(e) if e.is_not_found() => {
            log::debug!("optional file {} does not exist", path);
            Ok(ResolvedValue::new(Value::Null))
        }
        Err(e) => Err(file_io_error(path, e)),
    }
}

fn vault_resolver(payload: &str, ctx: &ResolveContext<'_>) -> Result<ResolvedValue> {
    let store = ctx.secrets.ok_or_else(|| Error::no_provider(VAULT))?;
    ctx.cancel.check()?;

    let secret = SecretRef::parse(payload);
    let data = store.read_secret(secret.path, secret.mount, ctx.cancel)?;

    Ok(ResolvedValue::from_source(
        Value::Mapping(data),
        secret.source(),
    ))
}
