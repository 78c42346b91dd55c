//! In-memory fakes for tests.
//!
//! Deterministic stand-ins for the provisioning gate, the sentiment model
//! and the scorer, with call counters so tests can assert how often the
//! real dependency would have been hit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use corpus_provisioner::ProvisionState;

use crate::domain::{ModelError, SentimentScore};
use crate::model::SentimentModel;
use crate::scorer::{CorpusGate, TextScorer};

// ---------------------------------------------------------------------------
// FixedGate
// ---------------------------------------------------------------------------

/// [`CorpusGate`] that reports whatever state it was last given.
pub struct FixedGate {
    state: Mutex<ProvisionState>,
    reason: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl FixedGate {
    pub fn new(state: ProvisionState) -> Self {
        Self {
            state: Mutex::new(state),
            reason: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, state: ProvisionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Reason returned from [`CorpusGate::last_error`].
    pub fn set_reason(&self, reason: impl Into<String>) {
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Number of `ensure_ready` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CorpusGate for FixedGate {
    fn ensure_ready(&self) -> ProvisionState {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.state()
    }

    fn state(&self) -> ProvisionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_error(&self) -> Option<String> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// FixedModel
// ---------------------------------------------------------------------------

/// [`SentimentModel`] returning a constant pair, or `NotProvisioned` on demand.
pub struct FixedModel {
    polarity: f64,
    subjectivity: f64,
    failing: AtomicBool,
    calls: AtomicUsize,
    last_text: Mutex<Option<String>>,
}

impl FixedModel {
    pub fn new(polarity: f64, subjectivity: f64) -> Self {
        Self {
            polarity,
            subjectivity,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_text: Mutex::new(None),
        }
    }

    pub fn fail_with_not_provisioned(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text passed to the most recent `analyze` call.
    pub fn last_text(&self) -> Option<String> {
        self.last_text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SentimentModel for FixedModel {
    fn analyze(&self, text: &str) -> Result<(f64, f64), ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_text.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ModelError::NotProvisioned);
        }
        Ok((self.polarity, self.subjectivity))
    }
}

// ---------------------------------------------------------------------------
// CountingScorer
// ---------------------------------------------------------------------------

type ScoreFn = Box<dyn Fn(&str) -> SentimentScore + Send + Sync>;

/// [`TextScorer`] that counts invocations.
pub struct CountingScorer {
    score_fn: ScoreFn,
    delay: Option<Duration>,
    degraded: AtomicBool,
    calls: AtomicUsize,
}

impl CountingScorer {
    /// Same score for every text.
    pub fn fixed(polarity: f64, subjectivity: f64) -> Self {
        let score = SentimentScore::new(polarity, subjectivity);
        Self::from_fn(move |_| score)
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) -> SentimentScore + Send + Sync + 'static,
    {
        Self {
            score_fn: Box::new(f),
            delay: None,
            degraded: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every `score` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// While set, every call reports a degraded result.
    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextScorer for CountingScorer {
    fn score_checked(&self, text: &str) -> Option<SentimentScore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.degraded.load(Ordering::SeqCst) {
            return None;
        }
        Some((self.score_fn)(text))
    }
}
