//! Reading configuration files into a [`Value`] tree
//!
//! The format is picked from the file extension: `.yaml`/`.yml` and
//! `.json` are decoded, anything else is returned as one string.

use std::path::Path;

use crate::value::Value;

/// File formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Text,
}

impl Format {
    /// Pick the format for a path by its extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            Some("json") => Format::Json,
            _ => Format::Text,
        }
    }

    /// Decode file contents in this format
    pub fn decode(self, content: String) -> Result<Value, SourceError> {
        match self {
            Format::Yaml => Ok(serde_yaml::from_str(&content)?),
            Format::Json => Ok(serde_json::from_str(&content)?),
            Format::Text => Ok(Value::String(content)),
        }
    }
}

/// Failure to read or decode a source file
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Whether the file simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Read and decode a file by extension
pub fn read_file(path: impl AsRef<Path>) -> Result<Value, SourceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    Format::from_path(path).decode(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.txt")), Format::Text);
        assert_eq!(Format::from_path(Path::new("secret")), Format::Text);
        assert_eq!(Format::from_path(Path::new("dir.yaml/secret")), Format::Text);
    }

    #[test]
    fn test_read_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.yaml");
        std::fs::write(&path, "host: localhost\nport: 5432\n").unwrap();

        let value = read_file(&path).unwrap();
        assert_eq!(value.get_path("host").unwrap().as_str(), Some("localhost"));
        assert_eq!(value.get_path("port").unwrap().as_i64(), Some(5432));
    }

    #[test]
    fn test_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"hosts": ["a", "b"]}"#).unwrap();

        let value = read_file(&path).unwrap();
        assert_eq!(value.get_path("hosts[1]").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn test_read_text_file_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "s3cr3t\n").unwrap();

        assert_eq!(read_file(&path).unwrap(), Value::String("s3cr3t\n".into()));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_json_is_not_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_file(&path).unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("invalid JSON"));
    }
}
