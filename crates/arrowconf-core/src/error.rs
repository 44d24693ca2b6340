//! Error types for arrowconf
//!
//! Errors are structured: a kind, the tree path where resolution failed,
//! the directive being resolved, and an actionable help message.

use std::fmt;

/// Result type alias for arrowconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for arrowconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the tree where the error occurred (e.g., "database.hosts[0]")
    pub path: Option<String>,
    /// The directive string that failed (e.g., "ENV->DB_HOST::atoi")
    pub directive: Option<String>,
    /// The suffix operator that failed, if any
    pub suffix: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required environment variable is unset or empty
    MissingInput { var_name: String },
    /// File or secret-store access failed
    Io { resource: String },
    /// A value could not be parsed (suffix input, file contents)
    Parse,
    /// A suffix received a value of the wrong shape
    TypeCoercion,
    /// A directive needs a provider that was not configured
    NoProvider { prefix: String },
    /// A provider rejected the request (authentication, bad path)
    Provider { name: String, message: String },
    /// Resolution was cancelled or ran past its deadline
    Cancelled,
    /// A directive resolved back into itself
    CircularReference,
    /// Directive nesting went deeper than allowed
    DepthExceeded { limit: usize },
    /// A prefix or suffix name was registered twice
    AlreadyRegistered { name: String },
    /// Internal error (bug in arrowconf)
    Internal,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            directive: None,
            suffix: None,
            help: None,
            cause: None,
        }
    }

    /// Create a missing environment variable error
    pub fn missing_env(var_name: impl Into<String>) -> Self {
        let var = var_name.into();
        Self {
            help: Some(format!(
                "Set the {} environment variable, or use OENV->{} if it is optional",
                var, var
            )),
            ..Self::new(ErrorKind::MissingInput { var_name: var })
        }
    }

    /// Create an I/O error for a file or secret
    pub fn io(resource: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            cause: Some(cause.into()),
            ..Self::new(ErrorKind::Io {
                resource: resource.into(),
            })
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Parse)
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self {
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
            ..Self::new(ErrorKind::TypeCoercion)
        }
    }

    /// Create a missing provider error
    pub fn no_provider(prefix: impl Into<String>) -> Self {
        let p = prefix.into();
        Self {
            help: Some(format!(
                "Configure a secret store on the interpolator before using {} directives",
                p
            )),
            ..Self::new(ErrorKind::NoProvider { prefix: p })
        }
    }

    /// Create a provider error
    pub fn provider(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Provider {
            name: name.into(),
            message: message.into(),
        })
    }

    /// Create a cancellation error
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            cause: Some(reason.into()),
            ..Self::new(ErrorKind::Cancelled)
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(chain: Vec<String>) -> Self {
        let chain_str = chain.join(" → ");
        Self {
            help: Some("Break the cycle by removing one of the directives".into()),
            cause: Some(format!("Chain: {}", chain_str)),
            ..Self::new(ErrorKind::CircularReference)
        }
    }

    /// Create a nesting depth error
    pub fn depth_exceeded(limit: usize) -> Self {
        Self {
            help: Some("Reduce directive nesting or raise max_depth".into()),
            ..Self::new(ErrorKind::DepthExceeded { limit })
        }
    }

    /// Create a resolver already registered error
    pub fn already_registered(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            help: Some(format!("Register '{}' only once per registry", n)),
            ..Self::new(ErrorKind::AlreadyRegistered { name: n })
        }
    }

    /// Create an internal error (bug in arrowconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            help: Some("This is likely a bug in arrowconf. Please report it.".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Internal)
        }
    }

    /// Prepend a mapping key to the error path
    pub fn at_key(mut self, key: &str) -> Self {
        self.path = Some(match self.path.take() {
            None => key.to_string(),
            Some(inner) if inner.starts_with('[') => format!("{}{}", key, inner),
            Some(inner) => format!("{}.{}", key, inner),
        });
        self
    }

    /// Prepend a sequence index to the error path
    pub fn at_index(mut self, index: usize) -> Self {
        self.path = Some(match self.path.take() {
            None => format!("[{}]", index),
            Some(inner) if inner.starts_with('[') => format!("[{}]{}", index, inner),
            Some(inner) => format!("[{}].{}", index, inner),
        });
        self
    }

    /// Record the failing directive; the innermost directive is kept
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        if self.directive.is_none() {
            self.directive = Some(directive.into());
        }
        self
    }

    /// Record the failing suffix; the innermost suffix is kept
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        if self.suffix.is_none() {
            self.suffix = Some(suffix.into());
        }
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether the error was caused by cancellation or a deadline
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::MissingInput { var_name } => {
                write!(f, "Required environment variable not set: {}", var_name)?
            }
            ErrorKind::Io { resource } => write!(f, "I/O error: {}", resource)?,
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::NoProvider { prefix } => {
                write!(f, "No secret store configured for {}", prefix)?
            }
            ErrorKind::Provider { name, message } => {
                write!(f, "Provider '{}' error: {}", name, message)?
            }
            ErrorKind::Cancelled => write!(f, "Resolution cancelled")?,
            ErrorKind::CircularReference => write!(f, "Circular reference detected")?,
            ErrorKind::DepthExceeded { limit } => {
                write!(f, "Directive nesting exceeded {} levels", limit)?
            }
            ErrorKind::AlreadyRegistered { name } => {
                write!(f, "Resolver '{}' is already registered", name)?
            }
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(directive) = &self.directive {
            write!(f, "\n  Directive: {}", directive)?;
        }

        if let Some(suffix) = &self.suffix {
            write!(f, "\n  Suffix: ::{}", suffix)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error_display() {
        let err = Error::missing_env("MY_VAR").at_key("password").at_key("database");
        let display = format!("{}", err);

        assert!(display.contains("Required environment variable not set: MY_VAR"));
        assert!(display.contains("Path: database.password"));
        assert!(display.contains("OENV->MY_VAR"));
    }

    #[test]
    fn test_path_building_mixed() {
        let err = Error::parse("bad")
            .at_key("host")
            .at_index(2)
            .at_key("servers")
            .at_index(0);

        assert_eq!(err.path.as_deref(), Some("[0].servers[2].host"));
    }

    #[test]
    fn test_path_building_nested_indexes() {
        let err = Error::parse("bad").at_index(1).at_index(0).at_key("matrix");
        assert_eq!(err.path.as_deref(), Some("matrix[0][1]"));
    }

    #[test]
    fn test_innermost_directive_kept() {
        let err = Error::missing_env("INNER")
            .with_directive("ENV->INNER")
            .with_directive("FS->outer.yaml");

        assert_eq!(err.directive.as_deref(), Some("ENV->INNER"));
    }

    #[test]
    fn test_suffix_display() {
        let err = Error::parse("invalid digit found in string")
            .with_suffix("atoi")
            .with_directive("test::atoi");
        let display = format!("{}", err);

        assert!(display.contains("Directive: test::atoi"));
        assert!(display.contains("Suffix: ::atoi"));
        assert!(display.contains("invalid digit"));
    }

    #[test]
    fn test_circular_reference_error_display() {
        let err = Error::circular_reference(vec!["file:a.yaml".into(), "file:a.yaml".into()]);
        let display = format!("{}", err);

        assert!(display.contains("Circular reference detected"));
        assert!(display.contains("file:a.yaml → file:a.yaml"));
    }

    #[test]
    fn test_no_provider_error() {
        let err = Error::no_provider("VAULT->");

        assert_eq!(
            err.kind,
            ErrorKind::NoProvider {
                prefix: "VAULT->".into()
            }
        );
        assert!(err.to_string().contains("Help:"));
    }

    #[test]
    fn test_cancelled() {
        let err = Error::cancelled("deadline exceeded");
        assert!(err.is_cancelled());
        assert!(!Error::internal("x").is_cancelled());
    }

    #[test]
    fn test_with_help_overrides() {
        let err = Error::parse("bad input").with_help("Try fixing the syntax");
        assert!(format!("{}", err).contains("Help: Try fixing the syntax"));
    }
}
