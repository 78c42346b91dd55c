//! Provisioner configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProvisionError;
use crate::{LEXICON_CORPUS, TOKENIZER_CORPUS};

/// Default bound on a single corpus download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound on waiting for another worker's corpus lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(15);
/// Default minimum interval between attempts while `Failed`; zero retries
/// on every call.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::ZERO;

/// Where corpora live on disk, which ones are required, and how long any
/// single provisioning step may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Directory holding `<name>.txt`, `<name>.ready` and `<name>.lock`
    pub data_dir: PathBuf,
    /// Corpus names, fetched in order
    pub corpora: Vec<String>,
    /// Timeout for one fetch from the source
    pub fetch_timeout: Duration,
    /// Timeout for acquiring the per-corpus lock
    pub lock_timeout: Duration,
    /// Minimum interval between re-attempts after a failure (zero = every call)
    pub retry_backoff: Duration,
}

impl ProvisionerConfig {
    /// Config for the default corpora rooted at `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        ProvisionerConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            corpora: vec![TOKENIZER_CORPUS.to_string(), LEXICON_CORPUS.to_string()],
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Replace the required corpus list
    pub fn with_corpora<I, S>(mut self, corpora: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.corpora = corpora.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Reject configs that could escape the data directory or never finish.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.corpora.is_empty() {
            return Err(ProvisionError::Config(
                "at least one corpus is required".to_string(),
            ));
        }
        for name in &self.corpora {
            validate_corpus_name(name)?;
        }
        if self.fetch_timeout.is_zero() {
            return Err(ProvisionError::Config(
                "fetch timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Corpus names become file names, so only a conservative alphabet is allowed.
pub fn validate_corpus_name(name: &str) -> Result<(), ProvisionError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(ProvisionError::Config(format!(
            "invalid corpus name: {name:?}"
        )))
    }
}
