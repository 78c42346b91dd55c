//! Sentiment scorer: text in, clamped polarity/subjectivity out.
//!
//! The scorer is total over all strings. Empty input, unavailable corpora
//! and model failures all yield [`SentimentScore::NEUTRAL`]; overlong input
//! is truncated. Nothing here returns an error to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use corpus_provisioner::{CorpusProvisioner, ProvisionState};

use crate::domain::SentimentScore;
use crate::metrics::METRICS;
use crate::model::SentimentModel;
use crate::obs;

/// Default cap on scored characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 10_000;

/// Access to the process's provisioning state, injectable for tests.
pub trait CorpusGate: Send + Sync {
    /// Attempt provisioning if needed and return the resulting state.
    fn ensure_ready(&self) -> ProvisionState;

    /// Current state without attempting anything.
    fn state(&self) -> ProvisionState;

    /// Most recent failure reason, if any.
    fn last_error(&self) -> Option<String> {
        None
    }
}

impl CorpusGate for CorpusProvisioner {
    fn ensure_ready(&self) -> ProvisionState {
        CorpusProvisioner::ensure_ready(self)
    }

    fn state(&self) -> ProvisionState {
        CorpusProvisioner::state(self)
    }

    fn last_error(&self) -> Option<String> {
        CorpusProvisioner::last_error(self)
    }
}

/// Anything the score cache can delegate to.
pub trait TextScorer: Send + Sync {
    /// `None` when the result would be a degraded fallback rather than a
    /// real score. Degraded results must not be cached.
    fn score_checked(&self, text: &str) -> Option<SentimentScore>;

    fn score(&self, text: &str) -> SentimentScore {
        self.score_checked(text).unwrap_or(SentimentScore::NEUTRAL)
    }
}

/// Scores text with a [`SentimentModel`] once the [`CorpusGate`] is ready.
pub struct SentimentScorer {
    gate: Arc<dyn CorpusGate>,
    model: Arc<dyn SentimentModel>,
    max_text_chars: usize,
    // Set while a non-ready state has been reported, so a long outage logs once.
    unavailable_reported: AtomicBool,
}

impl SentimentScorer {
    pub fn new(gate: Arc<dyn CorpusGate>, model: Arc<dyn SentimentModel>) -> Self {
        Self {
            gate,
            model,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            unavailable_reported: AtomicBool::new(false),
        }
    }

    /// Texts longer than `max_chars` characters are cut before scoring.
    /// Zero is treated as one.
    pub fn with_max_text_chars(mut self, max_chars: usize) -> Self {
        self.max_text_chars = max_chars.max(1);
        self
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars
    }

    /// Score `text`. The result carries revision `0`.
    pub fn score(&self, text: &str) -> SentimentScore {
        self.score_checked(text).unwrap_or(SentimentScore::NEUTRAL)
    }

    /// Like [`score`](Self::score), but `None` instead of the neutral
    /// fallback when corpora are unavailable or the model fails.
    pub fn score_checked(&self, text: &str) -> Option<SentimentScore> {
        if text.trim().is_empty() {
            return Some(SentimentScore::NEUTRAL);
        }

        let state = self.gate.ensure_ready();
        if !state.is_ready() {
            self.report_unavailable(state);
            METRICS.inc_neutral_fallbacks();
            return None;
        }
        self.unavailable_reported.store(false, Ordering::Relaxed);

        let text = match truncate_chars(text, self.max_text_chars) {
            Some(cut) => {
                obs::emit_text_truncated(text.chars().count(), self.max_text_chars);
                METRICS.inc_truncations();
                cut
            }
            None => text,
        };

        match self.model.analyze(text) {
            Ok((polarity, subjectivity)) => {
                METRICS.inc_scores_computed();
                Some(SentimentScore::new(polarity, subjectivity))
            }
            Err(err) => {
                obs::emit_score_degraded(&err);
                METRICS.inc_neutral_fallbacks();
                None
            }
        }
    }

    fn report_unavailable(&self, state: ProvisionState) {
        if self.unavailable_reported.swap(true, Ordering::Relaxed) {
            return;
        }
        let reason = self.gate.last_error();
        obs::emit_provision_unavailable(state.as_str(), reason.as_deref());
        if state == ProvisionState::Failed {
            METRICS.inc_provision_failures();
        }
    }
}

impl TextScorer for SentimentScorer {
    fn score_checked(&self, text: &str) -> Option<SentimentScore> {
        SentimentScorer::score_checked(self, text)
    }
}

/// Prefix of `text` holding at most `max_chars` characters, or `None` when
/// it already fits.
fn truncate_chars(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_chars)
        .map(|(byte_idx, _)| &text[..byte_idx])
}
