//! Vault client errors

use arrowconf_core::Error;

/// Failure talking to Vault
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The credentials file names an auth method other than AppRole
    #[error("unsupported auth method '{0}', at least one auth method should be specified (approle)")]
    NoAuth(String),

    /// Vault answered with a non-success status
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request ran past its timeout
    #[error("{url}: request timed out")]
    Timeout { url: String },

    /// Connection or protocol failure
    #[error("{url}: {message}")]
    Transport { url: String, message: String },

    /// The response body was not what the API documents
    #[error("{url}: malformed response: {message}")]
    Decode { url: String, message: String },
}

impl VaultError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        let url = url.to_string();
        match err {
            ureq::Error::StatusCode(status) => VaultError::Status { url, status },
            ureq::Error::Timeout(_) => VaultError::Timeout { url },
            other => VaultError::Transport {
                url,
                message: other.to_string(),
            },
        }
    }

    /// Whether Vault reported that nothing exists at the path
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::Status { status: 404, .. })
    }

    /// Convert a failed secret read into an I/O error on `resource`
    pub fn into_read_error(self, resource: &str) -> Error {
        let help = match &self {
            VaultError::Status { status: 404, .. } => {
                Some("Check the secret path and mount (use VAULT->/mount/path for a non-default mount)")
            }
            VaultError::Status { status: 403, .. } => {
                Some("The Vault token's policy does not allow reading this path")
            }
            _ => None,
        };
        let err = Error::io(resource, self.to_string());
        match help {
            Some(help) => err.with_help(help),
            None => err,
        }
    }
}

impl From<VaultError> for Error {
    fn from(err: VaultError) -> Self {
        Error::provider("vault", err.to_string())
    }
}
