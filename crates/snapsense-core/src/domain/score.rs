//! Sentiment score value type.

use serde::{Deserialize, Serialize};

/// Polarity/subjectivity pair computed for one revision of a fragment.
///
/// # Invariants
///
/// `polarity` is in `[-1.0, 1.0]` and `subjectivity` in `[0.0, 1.0]`;
/// [`SentimentScore::new`] clamps and maps NaN to `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub polarity: f64,
    pub subjectivity: f64,
    /// Revision of the fragment this was computed for; `0` for free text.
    pub computed_at_revision: u64,
}

impl SentimentScore {
    pub const NEUTRAL: SentimentScore = SentimentScore {
        polarity: 0.0,
        subjectivity: 0.0,
        computed_at_revision: 0,
    };

    pub fn new(polarity: f64, subjectivity: f64) -> Self {
        Self {
            polarity: clamp_finite(polarity, -1.0, 1.0),
            subjectivity: clamp_finite(subjectivity, 0.0, 1.0),
            computed_at_revision: 0,
        }
    }

    /// Same values, stamped with `revision`.
    pub fn at_revision(self, revision: u64) -> Self {
        Self {
            computed_at_revision: revision,
            ..self
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.polarity == 0.0 && self.subjectivity == 0.0
    }
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}
