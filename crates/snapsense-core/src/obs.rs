//! Structured observability hooks for the scoring pipeline.
//!
//! Provisioning failures and degraded scores never reach callers; these
//! events are the only place they surface. Each event carries an `event`
//! field so log pipelines can filter on it.

use tracing::{debug, info, warn};

use crate::domain::FragmentKey;

/// RAII guard that enters a fragment-scoped span while it is scored.
///
/// ```ignore
/// let _span = FragmentSpan::enter(&fragment.key(), fragment.revision);
/// // every event below carries content_id, field and revision
/// ```
pub struct FragmentSpan {
    _span: tracing::span::EnteredSpan,
}

impl FragmentSpan {
    pub fn enter(key: &FragmentKey, revision: u64) -> Self {
        let span = tracing::debug_span!(
            "snapsense.fragment",
            content_id = %key.content_id,
            field = %key.field_kind,
            revision = revision,
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Provisioning was attempted from the scoring path and did not reach READY.
pub fn emit_provision_unavailable(state: &str, reason: Option<&str>) {
    warn!(
        event = "provision.unavailable",
        state = %state,
        reason = reason.unwrap_or("in progress"),
    );
}

/// A text was scored as neutral because the model could not run.
pub fn emit_score_degraded(reason: &dyn std::fmt::Display) {
    warn!(event = "score.degraded", reason = %reason);
}

/// Input exceeded the configured length and was cut.
pub fn emit_text_truncated(original_chars: usize, max_chars: usize) {
    debug!(
        event = "score.truncated",
        original_chars = original_chars,
        max_chars = max_chars,
    );
}

/// A fragment crossed the moderation thresholds.
pub fn emit_fragment_flagged(index: usize, polarity: f64, subjectivity: f64) {
    info!(
        event = "moderation.flagged",
        index = index,
        polarity = polarity,
        subjectivity = subjectivity,
    );
}

/// A new comment was rejected at submission.
pub fn emit_comment_blocked(polarity: f64, threshold: f64) {
    info!(
        event = "moderation.comment_blocked",
        polarity = polarity,
        threshold = threshold,
    );
}
