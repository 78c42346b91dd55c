//! Pipeline facade for the hosting application.
//!
//! One [`SentimentPipeline`] per worker process. It owns the provisioning
//! gate, the scorer and the score cache, and applies the moderation policy.

use std::sync::Arc;

use corpus_provisioner::{
    CorpusProvisioner, CorpusSource, DirCorpusSource, HttpCorpusSource, ProvisionState,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheStats, ScoreCache};
use crate::config::PipelineConfig;
use crate::domain::{FieldKind, PipelineError, SentimentScore, TextFragment};
use crate::model::{LexiconModel, SentimentModel};
use crate::moderation::{self, CommentVerdict, ModerationPolicy, ModerationResult};
use crate::scorer::{CorpusGate, SentimentScorer};

/// Scores and moderation outcome for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoAnnotation {
    pub content_id: String,
    /// In the order the fragments were given.
    pub scores: Vec<SentimentScore>,
    pub moderation: ModerationResult,
}

pub struct SentimentPipeline {
    gate: Arc<dyn CorpusGate>,
    scorer: Arc<SentimentScorer>,
    cache: ScoreCache,
    policy: ModerationPolicy,
}

impl SentimentPipeline {
    /// Build the production pipeline. Performs no IO; corpora are fetched on
    /// [`warm_up`](Self::warm_up) or the first scored fragment.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let provisioner_config = config.provisioner();

        let source: Arc<dyn CorpusSource> = match &config.corpus_dir {
            Some(dir) => Arc::new(DirCorpusSource::new(dir)),
            None => Arc::new(HttpCorpusSource::new(
                &config.corpus_base_url,
                provisioner_config.fetch_timeout,
            )?),
        };
        let provisioner = Arc::new(CorpusProvisioner::new(provisioner_config, source)?);
        let model = Arc::new(LexiconModel::from_provisioner(&provisioner));

        info!(
            event = "pipeline.configured",
            data_dir = %config.data_dir.display(),
            cache_capacity = config.cache_capacity,
            local_mirror = config.corpus_dir.is_some(),
        );
        Ok(Self::with_components(provisioner, model, config))
    }

    /// Assemble from explicit parts; thresholds and limits come from `config`.
    pub fn with_components(
        gate: Arc<dyn CorpusGate>,
        model: Arc<dyn SentimentModel>,
        config: &PipelineConfig,
    ) -> Self {
        let scorer = Arc::new(
            SentimentScorer::new(Arc::clone(&gate), model).with_max_text_chars(config.max_text_chars),
        );
        let cache = ScoreCache::with_capacity(scorer.clone(), config.cache_capacity);
        Self {
            gate,
            scorer,
            cache,
            policy: config.policy(),
        }
    }

    /// Attempt provisioning now instead of on the first request.
    pub fn warm_up(&self) -> ProvisionState {
        self.gate.ensure_ready()
    }

    pub fn provision_state(&self) -> ProvisionState {
        self.gate.state()
    }

    /// Most recent provisioning failure, if any.
    pub fn provision_error(&self) -> Option<String> {
        self.gate.last_error()
    }

    /// Cached score for this revision of `fragment`.
    pub fn get_or_compute(&self, fragment: &TextFragment) -> SentimentScore {
        self.cache.get_or_compute(fragment)
    }

    /// Uncached score for free text.
    pub fn score_text(&self, text: &str) -> SentimentScore {
        self.scorer.score(text)
    }

    pub fn invalidate(&self, content_id: &str, field_kind: FieldKind) -> bool {
        self.cache.invalidate(content_id, field_kind)
    }

    pub fn invalidate_content(&self, content_id: &str) -> usize {
        self.cache.invalidate_content(content_id)
    }

    pub fn evaluate(&self, scores: &[SentimentScore]) -> ModerationResult {
        moderation::evaluate(&self.policy, scores)
    }

    /// Score every fragment of a photo through the cache and evaluate them.
    pub fn annotate(&self, content_id: &str, fragments: &[TextFragment]) -> PhotoAnnotation {
        let scores: Vec<SentimentScore> = fragments
            .iter()
            .map(|fragment| self.get_or_compute(fragment))
            .collect();
        let moderation = self.evaluate(&scores);
        PhotoAnnotation {
            content_id: content_id.to_string(),
            scores,
            moderation,
        }
    }

    /// Screen a comment before it is stored. Not cached; the comment has no
    /// revision yet.
    pub fn screen_comment(&self, text: &str) -> CommentVerdict {
        moderation::screen_comment(&self.policy, &self.score_text(text))
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
