//! SnapSense Core Library
//!
//! Sentiment scoring for user-generated photo captions and comments: a
//! lexicon model behind a provisioning gate, a revision-aware score cache,
//! and the moderation/ranking adapter the feed consumes.

pub mod cache;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod model;
pub mod moderation;
pub mod obs;
pub mod pipeline;
pub mod scorer;
pub mod telemetry;

pub use cache::{CacheStats, ScoreCache, DEFAULT_CACHE_CAPACITY};
pub use config::PipelineConfig;
pub use domain::{
    ConfigError, FieldKind, FragmentKey, ModelError, PipelineError, SentimentScore, TextFragment,
};
pub use model::{Lexicon, LexiconEntry, LexiconModel, SentimentModel, Tokenizer};
pub use moderation::{
    evaluate, rank_weight, screen_comment, CommentVerdict, FlagReason, ModerationPolicy,
    ModerationResult,
};
pub use pipeline::{PhotoAnnotation, SentimentPipeline};
pub use scorer::{CorpusGate, SentimentScorer, TextScorer, DEFAULT_MAX_TEXT_CHARS};
pub use telemetry::{init_tracing, LogFormat};

pub use corpus_provisioner::{ProvisionError, ProvisionState};

/// SnapSense version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
