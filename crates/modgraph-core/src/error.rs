use std::path::PathBuf;

/// Errors that can occur across modgraph.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use modgraph_core::ModgraphError;
///
/// let err = ModgraphError::Config("damping must be in (0, 1)".into());
/// assert!(err.to_string().contains("damping"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ModgraphError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file or directory was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(help("check the --path argument points at an existing directory"))]
    FileNotFound(PathBuf),

    /// An exclude glob could not be compiled.
    #[error("invalid exclude pattern: {0}")]
    Pattern(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ModgraphError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = ModgraphError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = ModgraphError::FileNotFound(PathBuf::from("/tmp/missing"));
        assert!(err.to_string().contains("/tmp/missing"));
    }

    #[test]
    fn pattern_error_displays_pattern() {
        let err = ModgraphError::Pattern("[unclosed".into());
        assert_eq!(err.to_string(), "invalid exclude pattern: [unclosed");
    }
}
