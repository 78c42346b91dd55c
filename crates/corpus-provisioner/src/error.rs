//! Error types for corpus-provisioner

use thiserror::Error;

/// Errors that can occur while provisioning a corpus.
///
/// None of these reach callers of the scoring path: the provisioner records
/// them as the reason behind a `Failed` state.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Corpus repository unreachable
    #[error("network error fetching {corpus}: {message}")]
    Network { corpus: String, message: String },

    /// Fetch exceeded the configured timeout
    #[error("timed out fetching {corpus}")]
    Timeout { corpus: String },

    /// Repository answered with a non-success status
    #[error("corpus repository returned HTTP {status} for {corpus}")]
    HttpStatus { corpus: String, status: u16 },

    /// Another worker held the corpus lock for too long
    #[error("timed out after {waited_ms}ms waiting for the {corpus} lock")]
    LockTimeout { corpus: String, waited_ms: u64 },

    /// Corpus does not exist in the source
    #[error("corpus not found in source: {0}")]
    NotFound(String),

    /// Source returned zero bytes
    #[error("corpus {0} is empty")]
    EmptyCorpus(String),

    /// Data directory not writable
    #[error("permission denied: {0}")]
    Permission(String),

    /// Marker sidecar could not be parsed
    #[error("marker for {corpus} is corrupt: {reason}")]
    MarkerCorrupt { corpus: String, reason: String },

    /// Invalid provisioner configuration
    #[error("invalid provisioner config: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// JSON error while writing a marker
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Whether a later attempt may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            ProvisionError::Network { .. }
            | ProvisionError::Timeout { .. }
            | ProvisionError::LockTimeout { .. } => true,
            ProvisionError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            ProvisionError::Permission(err.to_string())
        } else {
            ProvisionError::Io(err)
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
