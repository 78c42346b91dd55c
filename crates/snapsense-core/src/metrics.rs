//! Global atomic counters for SnapSense observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. from the host's periodic stats hook).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocations, no locking.
pub struct Metrics {
    scores_computed: AtomicU64,
    neutral_fallbacks: AtomicU64,
    truncations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_evictions: AtomicU64,
    provision_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            scores_computed: AtomicU64::new(0),
            neutral_fallbacks: AtomicU64::new(0),
            truncations: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_evictions: AtomicU64::new(0),
            provision_failures: AtomicU64::new(0),
        }
    }

    /// A text went through the model.
    pub fn inc_scores_computed(&self) {
        self.scores_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// A text got a neutral score because corpora or the model were unavailable.
    pub fn inc_neutral_fallbacks(&self) {
        self.neutral_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "neutral_fallbacks", "counter incremented");
    }

    pub fn inc_truncations(&self) {
        self.truncations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_evictions(&self) {
        self.cache_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_provision_failures(&self) {
        self.provision_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "provision_failures", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (worker shutdown, periodic tick)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            scores_computed = self.scores_computed(),
            neutral_fallbacks = self.neutral_fallbacks(),
            truncations = self.truncations(),
            cache_hits = self.cache_hits(),
            cache_misses = self.cache_misses(),
            cache_evictions = self.cache_evictions(),
            provision_failures = self.provision_failures(),
        );
    }

    pub fn scores_computed(&self) -> u64 {
        self.scores_computed.load(Ordering::Relaxed)
    }

    pub fn neutral_fallbacks(&self) -> u64 {
        self.neutral_fallbacks.load(Ordering::Relaxed)
    }

    pub fn truncations(&self) -> u64 {
        self.truncations.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn cache_evictions(&self) -> u64 {
        self.cache_evictions.load(Ordering::Relaxed)
    }

    pub fn provision_failures(&self) -> u64 {
        self.provision_failures.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.scores_computed,
            &self.neutral_fallbacks,
            &self.truncations,
            &self.cache_hits,
            &self.cache_misses,
            &self.cache_evictions,
            &self.provision_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
