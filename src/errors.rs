//! Custom error types for the linkward risk engine.
//!
//! Only malformed input is surfaced to callers of a scan. Everything that
//! goes wrong while acquiring or inspecting a target is evidence and lives
//! in the scan result instead.

use std::path::PathBuf;

/// The main error type for linkward operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkwardError {
    /// Input is not a syntactically valid URL
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error (list files, report output)
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Regex compilation error
    #[error("Invalid regex pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tokio task join error
    #[error("Async task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Generic error for external library errors
    #[error("{context}: {message}")]
    External { context: String, message: String },
}

/// Result type alias using LinkwardError
pub type LinkwardResult<T> = Result<T, LinkwardError>;

impl LinkwardError {
    /// Create an invalid-URL error
    pub fn invalid_url(input: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a regex error with pattern context
    pub fn regex(source: regex::Error, pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create an external error with context
    pub fn external(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::External {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Convert from raw I/O errors (without path context)
impl From<std::io::Error> for LinkwardError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_display() {
        let err = LinkwardError::invalid_url("ht!tp://", "relative URL without a base");
        let msg = err.to_string();
        assert!(msg.contains("ht!tp://"));
        assert!(msg.contains("relative URL"));
    }

    #[test]
    fn test_io_error_display() {
        let err = LinkwardError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            Some(PathBuf::from("/etc/linkward/allow.json")),
        );
        assert!(err.to_string().contains("/etc/linkward/allow.json"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LinkwardError = io_err.into();
        assert!(matches!(err, LinkwardError::Io { path: None, .. }));
    }
}
