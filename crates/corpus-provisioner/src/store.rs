//! On-disk corpus layout, completion markers, and per-corpus advisory locks.
//!
//! Layout under the data directory:
//!
//! - `<name>.txt`: corpus data, replaced atomically
//! - `<name>.ready`: JSON [`ProvisionMarker`] written after the data
//! - `<name>.lock`: advisory lock file shared by every worker on the machine

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{ProvisionError, Result};

const LOCK_RETRY_SLEEP: Duration = Duration::from_millis(25);

/// Proof that a corpus file was completely written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionMarker {
    pub corpus: String,
    /// Hex SHA-256 of the data file
    pub sha256: String,
    pub bytes: u64,
    pub fetched_at: DateTime<Utc>,
    /// Where the data came from (URL or mirror path)
    pub source: String,
}

/// Filesystem view of one data directory.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    /// Does not touch the filesystem; directories are created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, corpus: &str) -> PathBuf {
        self.root.join(format!("{corpus}.txt"))
    }

    pub fn marker_path(&self, corpus: &str) -> PathBuf {
        self.root.join(format!("{corpus}.ready"))
    }

    pub fn lock_path(&self, corpus: &str) -> PathBuf {
        self.root.join(format!("{corpus}.lock"))
    }

    /// Read the marker for `corpus`, `None` when absent.
    pub fn read_marker(&self, corpus: &str) -> Result<Option<ProvisionMarker>> {
        let raw = match fs::read(self.marker_path(corpus)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| ProvisionError::MarkerCorrupt {
                corpus: corpus.to_string(),
                reason: e.to_string(),
            })
    }

    /// A corpus is provisioned when its marker parses and the data file
    /// hashes to the recorded digest. Corrupt markers count as absent so the
    /// next fetch overwrites them.
    pub fn is_provisioned(&self, corpus: &str) -> Result<bool> {
        let marker = match self.read_marker(corpus) {
            Ok(Some(marker)) => marker,
            Ok(None) => return Ok(false),
            Err(err @ ProvisionError::MarkerCorrupt { .. }) => {
                warn!(corpus = %corpus, error = %err, "ignoring corrupt corpus marker");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let data = match fs::read(self.data_path(corpus)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let matches = sha256_hex(&data) == marker.sha256;
        if !matches {
            warn!(corpus = %corpus, "corpus data does not match its marker digest");
        }
        Ok(matches)
    }

    /// Atomically install `data` for `corpus`, then its marker.
    pub fn install(&self, corpus: &str, data: &[u8], source: &str) -> Result<ProvisionMarker> {
        fs::create_dir_all(&self.root)?;

        write_atomic(&self.root, &self.data_path(corpus), data)?;

        let marker = ProvisionMarker {
            corpus: corpus.to_string(),
            sha256: sha256_hex(data),
            bytes: data.len() as u64,
            fetched_at: Utc::now(),
            source: source.to_string(),
        };
        let encoded = serde_json::to_vec_pretty(&marker)?;
        write_atomic(&self.root, &self.marker_path(corpus), &encoded)?;

        debug!(corpus = %corpus, bytes = marker.bytes, "corpus installed");
        Ok(marker)
    }

    /// Take the exclusive advisory lock for `corpus`, retrying until `timeout`.
    pub fn lock(&self, corpus: &str, timeout: Duration) -> Result<CorpusLock> {
        fs::create_dir_all(&self.root)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path(corpus))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(CorpusLock { file }),
                Err(e) if is_contended(&e) => {}
                Err(e) => return Err(e.into()),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(ProvisionError::LockTimeout {
                    corpus: corpus.to_string(),
                    waited_ms: waited.as_millis() as u64,
                });
            }
            thread::sleep(LOCK_RETRY_SLEEP.min(timeout - waited));
        }
    }
}

/// Held advisory lock; released on drop.
#[derive(Debug)]
pub struct CorpusLock {
    file: File,
}

impl Drop for CorpusLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

// Temp file in the destination directory, then rename over the target.
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("corpora"));
        (dir, store)
    }

    #[test]
    fn missing_corpus_is_not_provisioned() {
        let (_dir, store) = make_store();
        assert!(!store.is_provisioned("polarity-lexicon").unwrap());
        assert!(store.read_marker("polarity-lexicon").unwrap().is_none());
    }

    #[test]
    fn install_writes_data_and_marker() {
        let (_dir, store) = make_store();
        let marker = store
            .install("polarity-lexicon", b"good\t0.7\t0.6\n", "test")
            .unwrap();

        assert_eq!(marker.bytes, 14);
        assert_eq!(marker.sha256, sha256_hex(b"good\t0.7\t0.6\n"));
        assert_eq!(
            std::fs::read(store.data_path("polarity-lexicon")).unwrap(),
            b"good\t0.7\t0.6\n"
        );
        assert_eq!(store.read_marker("polarity-lexicon").unwrap(), Some(marker));
        assert!(store.is_provisioned("polarity-lexicon").unwrap());
    }

    #[test]
    fn tampered_data_is_not_provisioned() {
        let (_dir, store) = make_store();
        store.install("tokenizer-rules", b"don't\tdo not\n", "test").unwrap();
        std::fs::write(store.data_path("tokenizer-rules"), b"truncat").unwrap();
        assert!(!store.is_provisioned("tokenizer-rules").unwrap());
    }

    #[test]
    fn corrupt_marker_is_not_provisioned() {
        let (_dir, store) = make_store();
        store.install("tokenizer-rules", b"data", "test").unwrap();
        std::fs::write(store.marker_path("tokenizer-rules"), b"{not json").unwrap();

        assert!(matches!(
            store.read_marker("tokenizer-rules"),
            Err(ProvisionError::MarkerCorrupt { .. })
        ));
        assert!(!store.is_provisioned("tokenizer-rules").unwrap());
    }

    #[test]
    fn install_leaves_no_temp_files() {
        let (_dir, store) = make_store();
        store.install("a", b"one", "test").unwrap();
        store.install("a", b"two", "test").unwrap();

        let mut names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.ready", "a.txt"]);
    }

    #[test]
    fn second_lock_times_out_while_first_is_held() {
        let (_dir, store) = make_store();
        let held = store.lock("polarity-lexicon", Duration::from_secs(1)).unwrap();

        match store.lock("polarity-lexicon", Duration::from_millis(60)) {
            Err(ProvisionError::LockTimeout { corpus, .. }) => {
                assert_eq!(corpus, "polarity-lexicon")
            }
            other => panic!("expected LockTimeout, got {other:?}"),
        }

        drop(held);
        assert!(store.lock("polarity-lexicon", Duration::from_millis(60)).is_ok());
    }
}
