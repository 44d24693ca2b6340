//! HashiCorp Vault secret store for arrowconf
//!
//! Backs the `VAULT->` directive with the KV v2 secrets engine.
//!
//! ```yaml
//! database: VAULT->app/db          # mount "secret", path "app/db"
//! cache: VAULT->/kv/app/cache      # mount "kv", path "app/cache"
//! ```
//!
//! The client is usually built from a credentials file named by the
//! `VAULT_CONFIG` environment variable. It logs in with AppRole and renews
//! its token in a background thread until it is dropped.
//!
//! ```no_run
//! use std::sync::Arc;
//! use arrowconf_core::{CancelToken, Interpolator};
//! use arrowconf_vault::VaultClient;
//!
//! let cancel = CancelToken::new();
//! let vault = VaultClient::from_env(&cancel)?;
//! let interpolator = Interpolator::with_builtins()?.with_secret_store(Arc::new(vault));
//! # Ok::<(), arrowconf_core::Error>(())
//! ```

mod auth;
mod client;
mod error;

pub use auth::{AppRoleConfig, Creds, APPROLE, CREDS_ENV, RENEW_BUFFER, RENEW_TIMEOUT};
pub use client::{VaultClient, DEFAULT_MOUNT, REQUEST_TIMEOUT};
pub use error::VaultError;
