//! AppRole login and background token renewal

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Weak;
use std::thread;
use std::time::Duration;

use arrowconf_core::loader::{decode, read_value};
use arrowconf_core::{CancelToken, Error, Interpolator, Result};
use serde::Deserialize;

use crate::client::{Inner, REQUEST_TIMEOUT};

/// Environment variable naming the credentials file
pub const CREDS_ENV: &str = "VAULT_CONFIG";

/// The only supported auth method
pub const APPROLE: &str = "approle";

/// How long before lease expiry the token is renewed
pub const RENEW_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Timeout for one renewal request
pub const RENEW_TIMEOUT: Duration = Duration::from_secs(60);

/// AppRole login parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppRoleConfig {
    pub role_id: String,
    pub secret_id: String,
}

/// Contents of the credentials file
///
/// ```yaml
/// host: https://vault.internal:8200
/// method: approle
/// parameters:
///   role_id: ENV->VAULT_ROLE_ID
///   secret_id: FS->/run/secrets/vault-secret-id
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Creds {
    pub host: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub parameters: AppRoleConfig,
}

impl Creds {
    /// Read, interpolate and decode a credentials file.
    ///
    /// Only the built-in resolvers are available while loading, so the
    /// file cannot itself use `VAULT->`.
    pub fn load(path: impl AsRef<Path>, cancel: &CancelToken) -> Result<Self> {
        let raw = read_value(path)?;
        let resolved = Interpolator::with_builtins()?.interpolate_with(raw, cancel)?;
        decode(resolved)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub(crate) auth: AuthInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthInfo {
    pub(crate) client_token: String,
    pub(crate) lease_duration: u64,
}

/// Log in and store the client token, returning its lease
pub(crate) fn approle_login(
    inner: &Inner,
    approle: &AppRoleConfig,
    cancel: &CancelToken,
) -> Result<Duration> {
    cancel.check()?;

    let body = serde_json::json!({
        "role_id": approle.role_id,
        "secret_id": approle.secret_id,
    });
    let response: AuthResponse = inner
        .post_json("auth/approle/login", &body, cancel.bound(REQUEST_TIMEOUT))
        .map_err(|e| {
            Error::from(e).with_help("Check the AppRole role_id and secret_id in the Vault credentials")
        })?;

    inner.set_token(response.auth.client_token);
    Ok(Duration::from_secs(response.auth.lease_duration))
}

/// Renew the token shortly before each lease runs out.
///
/// Stops when the client is dropped, when a renewal fails, or when the
/// token has no lease.
pub(crate) fn spawn_renewal(
    inner: Weak<Inner>,
    stop: Receiver<()>,
    mut lease: Duration,
    buffer: Duration,
) {
    let spawned = thread::Builder::new()
        .name("vault-token-renew".into())
        .spawn(move || loop {
            if lease.is_zero() {
                log::debug!("vault token has no lease, renewal stopped");
                return;
            }

            match stop.recv_timeout(lease.saturating_sub(buffer)) {
                Err(RecvTimeoutError::Timeout) => {}
                // client dropped or renewal restarted
                _ => return,
            }

            let Some(inner) = inner.upgrade() else {
                return;
            };
            match inner.renew_self(RENEW_TIMEOUT) {
                Ok(response) => {
                    inner.set_token(response.auth.client_token);
                    lease = Duration::from_secs(response.auth.lease_duration);
                    log::debug!("vault token renewed for {:?}", lease);
                }
                Err(e) => {
                    log::warn!("vault token renewal failed: {}", e);
                    return;
                }
            }
        });

    if let Err(e) = spawned {
        log::warn!("failed to start vault token renewal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VaultClient;
    use arrowconf_core::{ErrorKind, SecretStore};
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn login_body(token: &str, lease: u64) -> String {
        format!(
            r#"{{"auth": {{"client_token": "{}", "lease_duration": {}, "renewable": true}}}}"#,
            token, lease
        )
    }

    fn write_creds(dir: &tempfile::TempDir, host: &str, method: &str) -> std::path::PathBuf {
        let path = dir.path().join("vault.yaml");
        std::fs::write(
            &path,
            format!(
                "host: {}\nmethod: {}\nparameters:\n  role_id: ENV->ARROWCONF_VAULT_ROLE_ID\n  secret_id: s3cr3t\n",
                host, method
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_creds_are_interpolated() {
        std::env::set_var("ARROWCONF_VAULT_ROLE_ID", "role-from-env");

        let dir = tempfile::tempdir().unwrap();
        let path = write_creds(&dir, "http://vault:8200", "approle");
        let creds = Creds::load(&path, &CancelToken::new()).unwrap();

        assert_eq!(creds.host, "http://vault:8200");
        assert_eq!(creds.method, "approle");
        assert_eq!(creds.parameters.role_id, "role-from-env");
        assert_eq!(creds.parameters.secret_id, "s3cr3t");
    }

    #[test]
    fn test_approle_login_sets_token() {
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/v1/auth/approle/login")
            .match_body(Matcher::Json(serde_json::json!({
                "role_id": "r",
                "secret_id": "s",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(login_body("s.issued", 0))
            .create();
        let read = server
            .mock("GET", "/v1/secret/data/app")
            .match_header("x-vault-token", "s.issued")
            .with_status(200)
            .with_body(r#"{"data": {"data": {"k": "v"}}}"#)
            .create();

        let approle = AppRoleConfig {
            role_id: "r".into(),
            secret_id: "s".into(),
        };
        let client = VaultClient::login_approle(server.url(), &approle, &CancelToken::new()).unwrap();
        client
            .read_secret("app", None, &CancelToken::new())
            .unwrap();

        login.assert();
        read.assert();
    }

    #[test]
    fn test_login_rejected_is_provider_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1/auth/approle/login")
            .with_status(400)
            .with_body(r#"{"errors": ["invalid role or secret ID"]}"#)
            .create();

        let err = VaultClient::login_approle(
            server.url(),
            &AppRoleConfig::default(),
            &CancelToken::new(),
        )
        .err()
        .unwrap();

        assert!(matches!(err.kind, ErrorKind::Provider { .. }));
        assert!(err.help.is_some());
    }

    #[test]
    fn test_only_approle_is_supported() {
        let creds = Creds {
            host: "http://127.0.0.1:1".into(),
            method: "token".into(),
            parameters: AppRoleConfig::default(),
        };

        let err = VaultClient::login(&creds, &CancelToken::new()).err().unwrap();
        assert!(err.to_string().contains("unsupported auth method 'token'"));
    }

    #[test]
    fn test_from_env() {
        std::env::remove_var(CREDS_ENV);
        let err = VaultClient::from_env(&CancelToken::new()).err().unwrap();
        assert_eq!(
            err.kind,
            ErrorKind::MissingInput {
                var_name: "VAULT_CONFIG".into()
            }
        );

        std::env::set_var("ARROWCONF_VAULT_ROLE_ID", "role-from-env");
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/v1/auth/approle/login")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "role_id": "role-from-env",
            })))
            .with_status(200)
            .with_body(login_body("s.env", 0))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let path = write_creds(&dir, &server.url(), "approle");
        std::env::set_var(CREDS_ENV, &path);

        let client = VaultClient::from_env(&CancelToken::new()).unwrap();
        assert_eq!(client.host(), server.url());
        login.assert();

        std::env::remove_var(CREDS_ENV);
    }

    #[test]
    fn test_token_is_renewed_before_lease_expires() {
        let mut server = mockito::Server::new();
        let renew = server
            .mock("POST", "/v1/auth/token/renew-self")
            .match_header("x-vault-token", "s.old")
            .with_status(200)
            .with_body(login_body("s.old", 0))
            .create();

        let client = VaultClient::with_token(server.url(), "s.old");
        client.start_renewal(Duration::from_millis(100), Duration::ZERO);

        let started = Instant::now();
        while !renew.matched() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(20));
        }
        renew.assert();
    }
}
