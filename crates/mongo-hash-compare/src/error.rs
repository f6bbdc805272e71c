//! Error types for the comparison library.

use thiserror::Error;

/// Main error type for comparison runs.
///
/// Everything except [`CompareError::Probe`] is fatal: it aborts the run before
/// reconciliation and no report is written. Probe errors are caught by the
/// collector and turned into [`crate::verify::Digest::Errored`].
#[derive(Error, Debug)]
pub enum CompareError {
    /// Configuration error (invalid YAML, missing URIs, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not connect to a cluster
    #[error("Failed to connect to {cluster} cluster: {message}")]
    Connection { cluster: String, message: String },

    /// Cluster rejected our credentials
    #[error("Authorization failed on {cluster} cluster: {message}")]
    Authorization { cluster: String, message: String },

    /// Database enumeration failed
    #[error("Failed to list databases on {cluster} cluster: {message}")]
    Listing { cluster: String, message: String },

    /// A single dbHash probe failed or timed out
    #[error("dbHash failed for {entity}: {message}")]
    Probe { entity: String, message: String },

    /// Report could not be rendered or persisted
    #[error("Report error: {0}")]
    Report(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet writer error
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl CompareError {
    /// Create a Connection error for the named cluster.
    pub fn connection(cluster: impl Into<String>, message: impl Into<String>) -> Self {
        CompareError::Connection {
            cluster: cluster.into(),
            message: message.into(),
        }
    }

    /// Create an Authorization error for the named cluster.
    pub fn authorization(cluster: impl Into<String>, message: impl Into<String>) -> Self {
        CompareError::Authorization {
            cluster: cluster.into(),
            message: message.into(),
        }
    }

    /// Create a Listing error for the named cluster.
    pub fn listing(cluster: impl Into<String>, message: impl Into<String>) -> Self {
        CompareError::Listing {
            cluster: cluster.into(),
            message: message.into(),
        }
    }

    /// Create a Probe error for one database or collection.
    pub fn probe(entity: impl Into<String>, message: impl Into<String>) -> Self {
        CompareError::Probe {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CompareError::Probe { .. })
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CompareError::Config(_) | CompareError::Yaml(_) => 2,
            CompareError::Connection { .. } | CompareError::Authorization { .. } => 3,
            CompareError::Listing { .. } => 4,
            CompareError::Report(_) | CompareError::Io(_) | CompareError::Xlsx(_) => 5,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for comparison operations.
pub type Result<T> = std::result::Result<T, CompareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_errors_are_not_fatal() {
        assert!(!CompareError::probe("shop.orders", "timed out").is_fatal());
        assert!(CompareError::listing("source", "not authorized").is_fatal());
        assert!(CompareError::connection("destination", "refused").is_fatal());
    }

    #[test]
    fn test_exit_codes_by_kind() {
        assert_eq!(CompareError::Config("x".into()).exit_code(), 2);
        assert_eq!(CompareError::connection("source", "x").exit_code(), 3);
        assert_eq!(CompareError::authorization("source", "x").exit_code(), 3);
        assert_eq!(CompareError::listing("source", "x").exit_code(), 4);
        assert_eq!(CompareError::Report("x".into()).exit_code(), 5);
    }

    #[test]
    fn test_cluster_failures_are_classified() {
        let fatal = [
            CompareError::connection("source", "refused"),
            CompareError::authorization("source", "bad credentials"),
            CompareError::listing("destination", "not authorized"),
        ];
        for err in &fatal {
            assert!(err.is_fatal());
            assert_ne!(err.exit_code(), 1, "{} fell through to the generic code", err);
        }
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = CompareError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: read-only"));
    }
}
