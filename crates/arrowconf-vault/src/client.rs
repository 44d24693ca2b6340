//! Vault HTTP client and its [`SecretStore`] implementation

use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use arrowconf_core::{CancelToken, Error, Result, SecretRef, SecretStore, Value};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{self, AppRoleConfig, AuthResponse, Creds};
use crate::error::VaultError;

/// Mount used when a `VAULT->` payload names none
pub const DEFAULT_MOUNT: &str = "secret";

/// Timeout for a single Vault request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a KV v2 read
#[derive(Deserialize)]
struct KvResponse {
    data: KvData,
}

#[derive(Deserialize)]
struct KvData {
    data: IndexMap<String, Value>,
}

pub(crate) struct Inner {
    agent: ureq::Agent,
    host: String,
    token: RwLock<String>,
    /// Dropping the sender wakes and stops the renewal thread
    pub(crate) renewal: Mutex<Option<mpsc::Sender<()>>>,
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.host.trim_end_matches('/'), path)
    }

    fn token(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> std::result::Result<T, VaultError> {
        let url = self.url(path);
        let mut response = self
            .agent
            .get(&url)
            .header("X-Vault-Token", &self.token())
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()
            .map_err(|e| VaultError::from_ureq(&url, e))?;

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| VaultError::Decode {
                url,
                message: e.to_string(),
            })
    }

    pub(crate) fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> std::result::Result<T, VaultError> {
        let url = self.url(path);
        let mut request = self.agent.post(&url);
        let token = self.token();
        if !token.is_empty() {
            request = request.header("X-Vault-Token", &token);
        }

        let mut response = request
            .config()
            .timeout_global(Some(timeout))
            .build()
            .send_json(body)
            .map_err(|e| VaultError::from_ureq(&url, e))?;

        response
            .body_mut()
            .read_json::<T>()
            .map_err(|e| VaultError::Decode {
                url,
                message: e.to_string(),
            })
    }

    pub(crate) fn renew_self(&self, timeout: Duration) -> std::result::Result<AuthResponse, VaultError> {
        self.post_json("auth/token/renew-self", &serde_json::json!({}), timeout)
    }
}

/// Client for the Vault KV v2 secrets engine.
///
/// Cheap to clone; clones share the token. A token obtained through AppRole
/// is renewed in the background until the last clone is dropped.
#[derive(Clone)]
pub struct VaultClient {
    pub(crate) inner: Arc<Inner>,
    default_mount: String,
}

impl VaultClient {
    fn build(host: impl Into<String>, token: String) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        let agent: ureq::Agent = config.into();

        Self {
            inner: Arc::new(Inner {
                agent,
                host: host.into(),
                token: RwLock::new(token),
                renewal: Mutex::new(None),
            }),
            default_mount: DEFAULT_MOUNT.to_string(),
        }
    }

    /// A client using an existing token. The token is not renewed.
    pub fn with_token(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self::build(host, token.into())
    }

    /// Log in with AppRole and keep the token renewed
    pub fn login_approle(
        host: impl Into<String>,
        approle: &AppRoleConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let client = Self::build(host, String::new());
        let lease = auth::approle_login(&client.inner, approle, cancel)?;
        client.start_renewal(lease, auth::RENEW_BUFFER);
        Ok(client)
    }

    /// Log in with the method named in `creds`
    pub fn login(creds: &Creds, cancel: &CancelToken) -> Result<Self> {
        if creds.method != auth::APPROLE {
            return Err(VaultError::NoAuth(creds.method.clone()).into());
        }
        Self::login_approle(creds.host.as_str(), &creds.parameters, cancel)
    }

    /// Build a client from the credentials file named by `VAULT_CONFIG`.
    ///
    /// The file is interpolated with the built-in resolvers (without
    /// `VAULT->`) before it is decoded.
    pub fn from_env(cancel: &CancelToken) -> Result<Self> {
        let path = match std::env::var(auth::CREDS_ENV) {
            Ok(path) if !path.is_empty() => path,
            _ => return Err(Error::missing_env(auth::CREDS_ENV)),
        };
        let creds = Creds::load(&path, cancel)?;
        log::debug!("logging in to vault at {}", creds.host);
        Self::login(&creds, cancel)
    }

    /// Use a different mount when a payload names none
    pub fn with_default_mount(mut self, mount: impl Into<String>) -> Self {
        self.default_mount = mount.into();
        self
    }

    /// The Vault address
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// The mount used when a payload names none
    pub fn default_mount(&self) -> &str {
        &self.default_mount
    }

    /// Read a KV v2 secret's data
    pub fn read(
        &self,
        path: &str,
        mount: Option<&str>,
        timeout: Duration,
    ) -> std::result::Result<IndexMap<String, Value>, VaultError> {
        let mount = mount.unwrap_or(self.default_mount.as_str());
        let api_path = format!(
            "{}/data/{}",
            mount.trim_matches('/'),
            path.trim_start_matches('/')
        );
        let response: KvResponse = self.inner.get_json(&api_path, timeout)?;
        Ok(response.data.data)
    }

    pub(crate) fn start_renewal(&self, lease: Duration, buffer: Duration) {
        let (stop, wake) = mpsc::channel();
        *self
            .inner
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stop);
        auth::spawn_renewal(Arc::downgrade(&self.inner), wake, lease, buffer);
    }
}

impl SecretStore for VaultClient {
    fn read_secret(
        &self,
        path: &str,
        mount: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<IndexMap<String, Value>> {
        cancel.check()?;

        let source = SecretRef { mount, path }.source();
        let timeout = cancel.bound(REQUEST_TIMEOUT);
        log::debug!("reading {}", source);

        self.read(path, mount, timeout).map_err(|e| {
            if matches!(e, VaultError::Timeout { .. }) && cancel.is_cancelled() {
                Error::cancelled("deadline exceeded")
            } else {
                e.into_read_error(&format!("secret {}", source))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrowconf_core::{ErrorKind, Interpolator};
    use pretty_assertions::assert_eq;

    const KV_BODY: &str = r#"{
        "data": {
            "data": {"user": "svc", "password": "hunter2", "pool": "10::atoi"},
            "metadata": {"version": 3}
        }
    }"#;

    #[test]
    fn test_read_default_mount() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v1/secret/data/app/db")
            .match_header("x-vault-token", "s.test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KV_BODY)
            .create();

        let client = VaultClient::with_token(server.url(), "s.test");
        let data = client
            .read_secret("app/db", None, &CancelToken::new())
            .unwrap();

        mock.assert();
        assert_eq!(data.get("user"), Some(&Value::String("svc".into())));
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_read_named_mount() {
        let mut server = mockito::Server::new();
        let kv = server
            .mock("GET", "/v1/kv/data/app/db")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KV_BODY)
            .create();

        let client = VaultClient::with_token(server.url(), "s.test");
        client
            .read_secret("app/db", Some("kv"), &CancelToken::new())
            .unwrap();

        kv.assert();
    }

    #[test]
    fn test_custom_default_mount() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v1/team/data/app")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KV_BODY)
            .create();

        let client = VaultClient::with_token(server.url(), "s.test").with_default_mount("team");
        assert_eq!(client.default_mount(), "team");
        client
            .read_secret("app", None, &CancelToken::new())
            .unwrap();

        mock.assert();
    }

    #[test]
    fn test_missing_secret_is_io_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/secret/data/nope")
            .with_status(404)
            .with_body(r#"{"errors": []}"#)
            .create();

        let client = VaultClient::with_token(server.url(), "s.test");
        let err = client
            .read_secret("nope", None, &CancelToken::new())
            .unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::Io {
                resource: "secret vault:nope".into()
            }
        );
        assert!(err.help.is_some());
    }

    #[test]
    fn test_malformed_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/secret/data/app")
            .with_status(200)
            .with_body("not json")
            .create();

        let client = VaultClient::with_token(server.url(), "s.test");
        let err = client
            .read_secret("app", None, &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_cancelled_before_request() {
        let client = VaultClient::with_token("http://127.0.0.1:1", "s.test");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = client.read_secret("app", None, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_vault_directive_end_to_end() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v1/kv/data/app/db")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KV_BODY)
            .create();

        let client = VaultClient::with_token(server.url(), "s.test");
        let interp = Interpolator::with_builtins()
            .unwrap()
            .with_secret_store(Arc::new(client));

        let tree: Value = serde_json::from_str(r#"{"db": "VAULT->/kv/app/db"}"#).unwrap();
        let resolved = interp.interpolate(tree).unwrap();

        assert_eq!(
            resolved.get_path("db.password").unwrap().as_str(),
            Some("hunter2")
        );
        assert_eq!(resolved.get_path("db.pool").unwrap().as_i64(), Some(10));
    }
}
