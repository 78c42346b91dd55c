//! Revision-aware LRU cache of sentiment scores.
//!
//! Keyed by fragment identity (content id + field). An entry is served only
//! when its `computed_at_revision` equals the requested fragment's revision;
//! anything else is recomputed. The cache is a pure optimisation over a
//! deterministic scorer, so eviction only costs a recompute. Degraded
//! fallbacks (corpora not ready yet) are returned but never stored.
//!
//! Scoring runs outside the lock. Two threads missing on the same key may
//! both compute; both get the same value because the scorer is
//! deterministic for a given text and provisioning state.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{FieldKind, FragmentKey, SentimentScore, TextFragment};
use crate::metrics::METRICS;
use crate::obs::FragmentSpan;
use crate::scorer::TextScorer;

/// Default number of cached fragments per worker.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hits over lookups; `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Bounded score cache in front of a [`TextScorer`].
pub struct ScoreCache {
    scorer: Arc<dyn TextScorer>,
    entries: Mutex<LruCache<FragmentKey, SentimentScore>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ScoreCache {
    pub fn new(scorer: Arc<dyn TextScorer>, capacity: NonZeroUsize) -> Self {
        Self {
            scorer,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Like [`new`](Self::new); a zero capacity is raised to one.
    pub fn with_capacity(scorer: Arc<dyn TextScorer>, capacity: usize) -> Self {
        Self::new(scorer, NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
    }

    /// Score for this exact revision of `fragment`, computing it on a miss.
    pub fn get_or_compute(&self, fragment: &TextFragment) -> SentimentScore {
        let key = fragment.key();
        let _span = FragmentSpan::enter(&key, fragment.revision);

        if let Some(hit) = self.lookup(&key, fragment.revision) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            METRICS.inc_cache_hits();
            trace!("score cache hit");
            return hit;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        METRICS.inc_cache_misses();

        match self.scorer.score_checked(&fragment.text) {
            Some(score) => {
                let fresh = score.at_revision(fragment.revision);
                self.store(key, fresh);
                fresh
            }
            None => {
                trace!("degraded score not cached");
                SentimentScore::NEUTRAL.at_revision(fragment.revision)
            }
        }
    }

    fn lookup(&self, key: &FragmentKey, revision: u64) -> Option<SentimentScore> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(score) if score.computed_at_revision == revision => Some(*score),
            _ => None,
        }
    }

    // Never replaces a newer revision with an older one.
    fn store(&self, key: FragmentKey, fresh: SentimentScore) {
        let mut entries = self.entries();
        match entries.peek(&key) {
            Some(existing) if existing.computed_at_revision > fresh.computed_at_revision => {
                trace!(
                    cached_revision = existing.computed_at_revision,
                    "keeping newer cached revision"
                );
                return;
            }
            Some(_) => {}
            None => {
                if entries.len() == entries.cap().get() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    METRICS.inc_cache_evictions();
                }
            }
        }
        entries.put(key, fresh);
    }

    /// Drop the entry for one field. Returns whether anything was cached.
    pub fn invalidate(&self, content_id: &str, field_kind: FieldKind) -> bool {
        self.entries()
            .pop(&FragmentKey::new(content_id, field_kind))
            .is_some()
    }

    /// Drop every field of a content item (e.g. the photo was deleted).
    /// Returns how many entries were removed.
    pub fn invalidate_content(&self, content_id: &str) -> usize {
        let mut entries = self.entries();
        FieldKind::ALL
            .iter()
            .filter(|kind| entries.pop(&FragmentKey::new(content_id, **kind)).is_some())
            .count()
    }

    /// Cached score for `key` without touching recency.
    pub fn peek(&self, key: &FragmentKey) -> Option<SentimentScore> {
        self.entries().peek(key).copied()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<FragmentKey, SentimentScore>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::CountingScorer;

    fn cache(capacity: usize) -> (Arc<CountingScorer>, ScoreCache) {
        let scorer = Arc::new(CountingScorer::fixed(-0.4, 0.6));
        let cache = ScoreCache::with_capacity(scorer.clone(), capacity);
        (scorer, cache)
    }

    #[test]
    fn hit_at_same_revision() {
        let (scorer, cache) = cache(8);
        let f = TextFragment::caption("p1", "meh", 3);
        let first = cache.get_or_compute(&f);
        let second = cache.get_or_compute(&f);
        assert_eq!(first, second);
        assert_eq!(first.computed_at_revision, 3);
        assert_eq!(scorer.calls(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn older_revision_does_not_clobber_newer_entry() {
        let (scorer, cache) = cache(8);
        let old = TextFragment::comment("p1", "first", 1);
        let new = old.edited("second");
        cache.get_or_compute(&new);
        let stale = cache.get_or_compute(&old);

        assert_eq!(stale.computed_at_revision, 1);
        assert_eq!(cache.peek(&new.key()).unwrap().computed_at_revision, 2);
        assert_eq!(scorer.calls(), 2);

        cache.get_or_compute(&new);
        assert_eq!(scorer.calls(), 2);
    }

    #[test]
    fn eviction_is_lru_and_counted() {
        let (scorer, cache) = cache(2);
        let a = TextFragment::caption("a", "x", 1);
        let b = TextFragment::caption("b", "x", 1);
        let c = TextFragment::caption("c", "x", 1);

        cache.get_or_compute(&a);
        cache.get_or_compute(&b);
        cache.get_or_compute(&a); // a is now most recent
        cache.get_or_compute(&c); // evicts b

        assert!(cache.peek(&a.key()).is_some());
        assert!(cache.peek(&b.key()).is_none());
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);

        cache.get_or_compute(&b);
        assert_eq!(scorer.calls(), 4);
    }

    #[test]
    fn invalidate_single_field_and_whole_content() {
        let (_scorer, cache) = cache(8);
        cache.get_or_compute(&TextFragment::caption("p1", "x", 1));
        cache.get_or_compute(&TextFragment::comment("p1", "y", 1));
        cache.get_or_compute(&TextFragment::caption("p2", "z", 1));

        assert!(cache.invalidate("p1", FieldKind::Caption));
        assert!(!cache.invalidate("p1", FieldKind::Caption));
        assert_eq!(cache.invalidate_content("p1"), 1);
        assert_eq!(cache.invalidate_content("p2"), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn degraded_scores_are_not_cached() {
        let (scorer, cache) = cache(8);
        let f = TextFragment::caption("p1", "gloomy", 1);
        scorer.set_degraded(true);
        assert!(cache.get_or_compute(&f).is_neutral());
        assert!(cache.peek(&f.key()).is_none());

        scorer.set_degraded(false);
        assert_eq!(cache.get_or_compute(&f).polarity, -0.4);
        assert_eq!(scorer.calls(), 2);
        assert!(cache.peek(&f.key()).is_some());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let (_scorer, cache) = cache(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn hit_rate() {
        let (_scorer, cache) = cache(4);
        assert_eq!(cache.stats().hit_rate(), 0.0);
        let f = TextFragment::caption("p", "x", 1);
        cache.get_or_compute(&f);
        cache.get_or_compute(&f);
        cache.get_or_compute(&f);
        let stats = cache.stats();
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
