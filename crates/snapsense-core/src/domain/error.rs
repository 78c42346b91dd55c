//! Domain-level error taxonomy for SnapSense.

use std::path::PathBuf;

/// Errors from loading or parsing the lexicon model's corpora.
///
/// The scorer turns every one of these into a neutral score.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("corpus data not provisioned")]
    NotProvisioned,

    #[error("failed to read corpus {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{corpus} line {line}: {reason}")]
    Parse {
        corpus: String,
        line: usize,
        reason: String,
    },

    #[error("corpus {0} contains no entries")]
    Empty(String),
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{field} out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors building a pipeline. Never produced by scoring operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("provisioner error: {0}")]
    Provision(#[from] corpus_provisioner::ProvisionError),
}
