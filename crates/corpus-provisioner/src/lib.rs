//! Corpus Provisioner: lexical resources for SnapSense scoring
//!
//! Makes sure the corpora the sentiment model reads are present on the
//! local filesystem before first use. Every worker process of the photo app
//! calls into this crate independently; the data directory is the only thing
//! they share.
//!
//! ## Guarantees
//!
//! - At most one download per corpus per machine (advisory lock + re-check)
//! - Readers never observe a partially written corpus (temp file + rename)
//! - Failures are recorded, never raised, and retried on later calls

pub mod config;
pub mod error;
pub mod provisioner;
pub mod source;
pub mod store;

pub use config::ProvisionerConfig;
pub use error::{ProvisionError, Result};
pub use provisioner::{CorpusProvisioner, ProvisionState};
pub use source::{CorpusSource, DirCorpusSource, HttpCorpusSource, DEFAULT_CORPUS_BASE_URL};
pub use store::{CorpusLock, CorpusStore, ProvisionMarker};

/// Contraction expansions consumed by the tokenizer.
pub const TOKENIZER_CORPUS: &str = "tokenizer-rules";

/// Word polarity/subjectivity/intensity table.
pub const LEXICON_CORPUS: &str = "polarity-lexicon";
