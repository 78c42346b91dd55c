//! Moderation and ranking adapter.
//!
//! Turns sentiment scores into the two signals the feed needs: whether a
//! photo's text should be flagged for human review, and a sentiment-derived
//! sort weight. Also screens new comments at submission time. Everything
//! here is a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::domain::SentimentScore;
use crate::obs;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Thresholds driving [`evaluate`] and [`screen_comment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModerationPolicy {
    /// Flag when polarity is strictly below this...
    pub negative_threshold: f64,
    /// ...and subjectivity strictly above this.
    pub subjectivity_threshold: f64,
    /// Block new comments whose polarity is strictly below this.
    pub comment_block_threshold: f64,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            negative_threshold: -0.5,
            subjectivity_threshold: 0.5,
            comment_block_threshold: -0.3,
        }
    }
}

impl ModerationPolicy {
    pub fn with_negative_threshold(mut self, threshold: f64) -> Self {
        self.negative_threshold = threshold;
        self
    }

    pub fn with_subjectivity_threshold(mut self, threshold: f64) -> Self {
        self.subjectivity_threshold = threshold;
        self
    }

    pub fn with_comment_block_threshold(mut self, threshold: f64) -> Self {
        self.comment_block_threshold = threshold;
        self
    }

    /// Strongly negative *and* opinionated; negative factual text passes.
    pub fn is_flagged(&self, score: &SentimentScore) -> bool {
        score.polarity < self.negative_threshold && score.subjectivity > self.subjectivity_threshold
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Why a fragment was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagReason {
    /// Position in the evaluated sequence.
    pub index: usize,
    pub polarity: f64,
    pub subjectivity: f64,
}

/// Outcome of evaluating one photo's fragment scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    /// In `[0, 1]`; higher surfaces the photo more prominently.
    pub rank_weight: f64,
    /// Flagged fragments (empty when not flagged).
    pub reasons: Vec<FlagReason>,
}

/// Submission decision for a new comment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CommentVerdict {
    Accepted,
    Blocked { polarity: f64 },
}

impl CommentVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, CommentVerdict::Blocked { .. })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Map polarity from `[-1, 1]` onto `[0, 1]`.
pub fn rank_weight(polarity: f64) -> f64 {
    ((polarity + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Evaluate all fragment scores of one content item.
///
/// Flagged when any score is flagged. The rank weight uses the mean
/// polarity; an empty sequence is neutral (`0.5`, not flagged). Ties in
/// rank weight are left to the caller (typically broken by recency).
pub fn evaluate(policy: &ModerationPolicy, scores: &[SentimentScore]) -> ModerationResult {
    let reasons: Vec<FlagReason> = scores
        .iter()
        .enumerate()
        .filter(|(_, score)| policy.is_flagged(score))
        .map(|(index, score)| FlagReason {
            index,
            polarity: score.polarity,
            subjectivity: score.subjectivity,
        })
        .collect();

    for reason in &reasons {
        obs::emit_fragment_flagged(reason.index, reason.polarity, reason.subjectivity);
    }

    let mean_polarity = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.polarity).sum::<f64>() / scores.len() as f64
    };

    ModerationResult {
        flagged: !reasons.is_empty(),
        rank_weight: rank_weight(mean_polarity),
        reasons,
    }
}

/// Decide whether a new comment may be posted.
pub fn screen_comment(policy: &ModerationPolicy, score: &SentimentScore) -> CommentVerdict {
    if score.polarity < policy.comment_block_threshold {
        obs::emit_comment_blocked(score.polarity, policy.comment_block_threshold);
        CommentVerdict::Blocked {
            polarity: score.polarity,
        }
    } else {
        CommentVerdict::Accepted
    }
}
