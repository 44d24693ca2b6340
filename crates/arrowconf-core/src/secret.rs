//! Secret store interface used by the `VAULT->` directive

use indexmap::IndexMap;

use crate::context::CancelToken;
use crate::error::Result;
use crate::value::Value;

/// A store that can fetch a secret's data subtree by path.
///
/// Implementations own authentication, transport and retries. They must
/// honor `cancel` for any network I/O they perform.
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`, under `mount` or the store's default mount
    fn read_secret(
        &self,
        path: &str,
        mount: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<IndexMap<String, Value>>;
}

/// A parsed `VAULT->` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretRef<'a> {
    /// Mount name, when the payload starts with `/mount/`
    pub mount: Option<&'a str>,
    /// Secret path below the mount
    pub path: &'a str,
}

impl<'a> SecretRef<'a> {
    /// Split a payload into mount and path.
    ///
    /// `/kv/app/db` reads `app/db` under mount `kv`; `app/db` uses the
    /// default mount. A single leading segment with no further `/` is a
    /// path, not a mount.
    pub fn parse(payload: &'a str) -> Self {
        if let Some(rest) = payload.strip_prefix('/') {
            if let Some((mount, path)) = rest.split_once('/') {
                if !mount.is_empty() {
                    return Self {
                        mount: Some(mount),
                        path,
                    };
                }
            }
            return Self {
                mount: None,
                path: rest,
            };
        }

        Self {
            mount: None,
            path: payload,
        }
    }

    /// Identity of this secret for cycle detection and logs
    pub fn source(&self) -> String {
        match self.mount {
            Some(mount) => format!("vault:{}/{}", mount, self.path),
            None => format!("vault:{}", self.path),
        }
    }
}
