//! Sentiment model capability and its lexicon implementation.

pub mod lexicon;
pub mod tokenizer;

pub use lexicon::{Lexicon, LexiconEntry, LexiconModel, NEGATION_FACTOR};
pub use tokenizer::Tokenizer;

use crate::domain::ModelError;

/// Anything that turns text into a raw `(polarity, subjectivity)` pair.
///
/// Implementations need not clamp; the scorer does.
pub trait SentimentModel: Send + Sync {
    fn analyze(&self, text: &str) -> Result<(f64, f64), ModelError>;
}
