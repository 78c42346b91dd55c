//! Domain types shared by the scorer, cache and moderation adapter.

pub mod error;
pub mod fragment;
pub mod score;

pub use error::{ConfigError, ModelError, PipelineError};
pub use fragment::{FieldKind, FragmentKey, TextFragment};
pub use score::SentimentScore;
