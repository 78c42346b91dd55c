//! Process-wide provisioning state machine.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ProvisionerConfig;
use crate::error::{ProvisionError, Result};
use crate::source::CorpusSource;
use crate::store::CorpusStore;

/// Lifecycle of the corpus data as seen by one process.
///
/// `Unknown` → `Provisioning` on the first attempt, then `Ready` or `Failed`.
/// `Failed` is retried on later calls; `Ready` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionState {
    Unknown,
    Provisioning,
    Ready,
    Failed,
}

impl ProvisionState {
    pub fn is_ready(self) -> bool {
        self == ProvisionState::Ready
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProvisionState::Unknown => "unknown",
            ProvisionState::Provisioning => "provisioning",
            ProvisionState::Ready => "ready",
            ProvisionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Status {
    state: ProvisionState,
    last_error: Option<String>,
    last_failure: Option<Instant>,
}

impl Status {
    fn backing_off(&self, backoff: Duration) -> bool {
        self.last_failure
            .map(|at| at.elapsed() < backoff)
            .unwrap_or(false)
    }
}

/// Ensures every configured corpus exists under the data directory.
///
/// One instance per process. Threads racing on [`ensure_ready`] never block
/// on each other: the loser sees `Provisioning`. Processes racing on the same
/// data directory serialize on the per-corpus lock file and re-check the
/// marker once they hold it, so each corpus is downloaded at most once.
///
/// [`ensure_ready`]: CorpusProvisioner::ensure_ready
pub struct CorpusProvisioner {
    config: ProvisionerConfig,
    store: CorpusStore,
    source: Arc<dyn CorpusSource>,
    status: Mutex<Status>,
    attempt: Mutex<()>,
}

impl CorpusProvisioner {
    /// Validates the config; performs no IO.
    pub fn new(config: ProvisionerConfig, source: Arc<dyn CorpusSource>) -> Result<Self> {
        config.validate()?;
        let store = CorpusStore::new(&config.data_dir);
        Ok(CorpusProvisioner {
            config,
            store,
            source,
            status: Mutex::new(Status {
                state: ProvisionState::Unknown,
                last_error: None,
                last_failure: None,
            }),
            attempt: Mutex::new(()),
        })
    }

    /// Bring every corpus to a provisioned state, or report why not.
    ///
    /// Never returns an error: failures are recorded and exposed through
    /// [`last_error`](Self::last_error). Returns `Ready` without IO once
    /// provisioning has succeeded in this process.
    pub fn ensure_ready(&self) -> ProvisionState {
        {
            let status = self.lock_status();
            match status.state {
                ProvisionState::Ready => return ProvisionState::Ready,
                ProvisionState::Failed if status.backing_off(self.config.retry_backoff) => {
                    return ProvisionState::Failed
                }
                _ => {}
            }
        }

        let _attempt = match self.attempt.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return match self.state() {
                    ProvisionState::Ready => ProvisionState::Ready,
                    _ => ProvisionState::Provisioning,
                }
            }
        };

        // The previous holder may have finished between the check and the lock.
        if self.state().is_ready() {
            return ProvisionState::Ready;
        }
        self.lock_status().state = ProvisionState::Provisioning;

        let started = Instant::now();
        info!(
            event = "provision.started",
            data_dir = %self.config.data_dir.display(),
            corpora = self.config.corpora.len(),
        );

        let outcome = self.provision_all();
        let mut status = self.lock_status();
        match outcome {
            Ok(fetched) => {
                info!(
                    event = "provision.ready",
                    fetched = fetched,
                    duration_ms = started.elapsed().as_millis() as u64,
                );
                status.state = ProvisionState::Ready;
                status.last_error = None;
                status.last_failure = None;
            }
            Err(err) => {
                warn!(
                    event = "provision.failed",
                    error = %err,
                    transient = err.is_transient(),
                    duration_ms = started.elapsed().as_millis() as u64,
                );
                status.state = ProvisionState::Failed;
                status.last_error = Some(err.to_string());
                status.last_failure = Some(Instant::now());
            }
        }
        status.state
    }

    fn provision_all(&self) -> Result<usize> {
        let mut fetched = 0;
        for corpus in &self.config.corpora {
            if self.provision_one(corpus)? {
                fetched += 1;
            }
        }
        Ok(fetched)
    }

    /// Check, lock, re-check, fetch. Returns whether a download happened.
    fn provision_one(&self, corpus: &str) -> Result<bool> {
        if self.store.is_provisioned(corpus)? {
            debug!(corpus = %corpus, "corpus already provisioned");
            return Ok(false);
        }

        let _lock = self.store.lock(corpus, self.config.lock_timeout)?;
        if self.store.is_provisioned(corpus)? {
            debug!(corpus = %corpus, "corpus provisioned by another worker");
            return Ok(false);
        }

        let data = self.source.fetch(corpus)?;
        if data.is_empty() {
            return Err(ProvisionError::EmptyCorpus(corpus.to_string()));
        }
        let marker = self
            .store
            .install(corpus, &data, &self.source.describe(corpus))?;

        info!(
            event = "provision.fetched",
            corpus = %corpus,
            bytes = marker.bytes,
            sha256 = %marker.sha256,
        );
        Ok(true)
    }

    /// Current state without attempting anything.
    pub fn state(&self) -> ProvisionState {
        self.lock_status().state
    }

    /// Reason for the most recent failure, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.lock_status().last_error.clone()
    }

    /// Path of the data file for `corpus`.
    pub fn resource_path(&self, corpus: &str) -> PathBuf {
        self.store.data_path(corpus)
    }

    pub fn corpora(&self) -> &[String] {
        &self.config.corpora
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    fn lock_status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CorpusProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorpusProvisioner")
            .field("data_dir", &self.config.data_dir)
            .field("corpora", &self.config.corpora)
            .field("state", &self.state())
            .finish()
    }
}
