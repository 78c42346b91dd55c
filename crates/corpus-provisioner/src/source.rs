//! Corpus sources
//!
//! A source turns a corpus name into bytes. The HTTP source talks to the
//! corpus repository; the directory source reads a local mirror, which is
//! what air-gapped deployments and tests use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{ProvisionError, Result};

/// Default corpus repository, overridable per deployment.
pub const DEFAULT_CORPUS_BASE_URL: &str = "https://corpora.snapsense.dev/v1";

/// Something that can produce the bytes of a named corpus.
pub trait CorpusSource: Send + Sync {
    /// Fetch the full contents of `corpus`.
    fn fetch(&self, corpus: &str) -> Result<Vec<u8>>;

    /// Human-readable origin recorded in the provision marker.
    fn describe(&self, corpus: &str) -> String;
}

/// Corpus repository reached over HTTP(S).
///
/// Uses `reqwest`'s blocking client: call it from a blocking context when
/// the host runs an async runtime.
pub struct HttpCorpusSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpCorpusSource {
    /// Create a client whose connect and total request time are bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(
                "snapsense-corpus-provisioner/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpCorpusSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `<base_url>/<corpus>.txt`
    pub fn corpus_url(&self, corpus: &str) -> String {
        format!("{}/{}.txt", self.base_url, corpus)
    }
}

impl CorpusSource for HttpCorpusSource {
    fn fetch(&self, corpus: &str) -> Result<Vec<u8>> {
        let url = self.corpus_url(corpus);
        debug!(corpus = %corpus, url = %url, "fetching corpus");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| classify(corpus, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProvisionError::NotFound(corpus.to_string()));
        }
        if !status.is_success() {
            return Err(ProvisionError::HttpStatus {
                corpus: corpus.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|e| classify(corpus, e))?;
        Ok(body.to_vec())
    }

    fn describe(&self, corpus: &str) -> String {
        self.corpus_url(corpus)
    }
}

fn classify(corpus: &str, err: reqwest::Error) -> ProvisionError {
    if err.is_timeout() {
        ProvisionError::Timeout {
            corpus: corpus.to_string(),
        }
    } else {
        ProvisionError::Network {
            corpus: corpus.to_string(),
            message: err.to_string(),
        }
    }
}

/// Local mirror directory holding `<corpus>.txt` files.
#[derive(Debug, Clone)]
pub struct DirCorpusSource {
    root: PathBuf,
}

impl DirCorpusSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        DirCorpusSource {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, corpus: &str) -> PathBuf {
        self.root.join(format!("{corpus}.txt"))
    }
}

impl CorpusSource for DirCorpusSource {
    fn fetch(&self, corpus: &str) -> Result<Vec<u8>> {
        std::fs::read(self.path_for(corpus)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProvisionError::NotFound(corpus.to_string())
            } else {
                e.into()
            }
        })
    }

    fn describe(&self, corpus: &str) -> String {
        self.path_for(corpus).display().to_string()
    }
}
