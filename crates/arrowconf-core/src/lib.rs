//! arrowconf-core: directive interpolation for decoded configuration trees
//!
//! String leaves of a YAML/JSON tree may carry directives: a prefix that
//! fetches a value from somewhere else and a chain of suffixes that coerce
//! it. Resolved values are interpolated again until nothing is left to do.
//!
//! ```text
//! ENV->NAME      OENV->NAME      FS->path      OFS->path      VAULT->[/mount/]path
//! <anything>::atoi      <anything>::duration      ENV->TIMEOUT::atoi::duration
//! ```
//!
//! # Example
//!
//! ```rust
//! use arrowconf_core::{Interpolator, Value};
//!
//! let tree: Value = serde_yaml::from_str("workers: 4::atoi\ntimeout: 1m30s::duration\n").unwrap();
//! let resolved = Interpolator::with_builtins().unwrap().interpolate(tree).unwrap();
//!
//! assert_eq!(resolved.get_path("workers").unwrap().as_i64(), Some(4));
//! assert_eq!(
//!     resolved.get_path("timeout").unwrap().as_duration(),
//!     Some(std::time::Duration::from_secs(90))
//! );
//! ```

pub mod base64;
pub mod context;
pub mod error;
pub mod grammar;
pub mod interpolator;
pub mod loader;
pub mod prefix;
pub mod resolver;
pub mod secret;
pub mod source;
pub mod suffix;
pub mod value;

pub use context::{CancelToken, ResolveContext};
pub use error::{Error, ErrorKind, Result};
pub use interpolator::{Interpolator, InterpolatorOptions};
pub use loader::{decode, load_config, load_value};
pub use resolver::{
    PrefixResolver, RegistryBuilder, ResolvedValue, ResolverRegistry, SuffixResolver,
};
pub use secret::{SecretRef, SecretStore};
pub use value::Value;
