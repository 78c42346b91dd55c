//! Scoring degrades to neutral, never to an error, when corpora are missing,
//! and recovers on its own once they become available.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use corpus_provisioner::{
    CorpusProvisioner, DirCorpusSource, ProvisionerConfig, LEXICON_CORPUS, TOKENIZER_CORPUS,
};
use snapsense_core::fakes::{FixedGate, FixedModel};
use snapsense_core::{
    LexiconModel, PipelineConfig, ProvisionState, SentimentPipeline, SentimentScore,
    SentimentScorer, TextFragment,
};

const LEXICON: &str = "terrible\t-1.0\t1.0\nawful\t-1.0\t1.0\nlovely\t0.5\t0.75\n";
const RULES: &str = "don't\tdo not\n";

fn write_mirror(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(format!("{LEXICON_CORPUS}.txt")), LEXICON).unwrap();
    std::fs::write(dir.join(format!("{TOKENIZER_CORPUS}.txt")), RULES).unwrap();
}

fn offline_pipeline(root: &Path) -> (Arc<CorpusProvisioner>, SentimentPipeline) {
    let config = ProvisionerConfig::new(root.join("data")).with_retry_backoff(Duration::ZERO);
    let source = Arc::new(DirCorpusSource::new(root.join("mirror")));
    let provisioner = Arc::new(CorpusProvisioner::new(config, source).unwrap());
    let model = Arc::new(LexiconModel::from_provisioner(&provisioner));
    let pipeline =
        SentimentPipeline::with_components(provisioner.clone(), model, &PipelineConfig::default());
    (provisioner, pipeline)
}

#[test]
fn test_failed_state_scores_neutral_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let (provisioner, pipeline) = offline_pipeline(dir.path());

    let score = pipeline.score_text("terrible awful day");
    assert_eq!(score, SentimentScore::NEUTRAL);
    assert_eq!(provisioner.state(), ProvisionState::Failed);
    assert!(pipeline.provision_error().is_some());

    let annotation = pipeline.annotate(
        "photo-1",
        &[TextFragment::caption("photo-1", "terrible awful day", 1)],
    );
    assert!(!annotation.moderation.flagged);
    assert_eq!(annotation.moderation.rank_weight, 0.5);
}

#[test]
fn test_recovers_once_mirror_appears() {
    let dir = tempfile::tempdir().unwrap();
    let (_provisioner, pipeline) = offline_pipeline(dir.path());
    assert!(pipeline.score_text("terrible awful day").is_neutral());

    write_mirror(&dir.path().join("mirror"));

    let score = pipeline.score_text("terrible awful day");
    assert_eq!(score.polarity, -1.0);
    assert_eq!(score.subjectivity, 1.0);
    assert_eq!(pipeline.provision_state(), ProvisionState::Ready);
}

#[test]
fn test_same_revision_is_rescored_once_corpora_are_ready() {
    let dir = tempfile::tempdir().unwrap();
    let (_provisioner, pipeline) = offline_pipeline(dir.path());
    let caption = TextFragment::caption("photo-2", "awful", 1);
    assert!(pipeline.get_or_compute(&caption).is_neutral());
    assert_eq!(pipeline.cache_stats().entries, 0);

    write_mirror(&dir.path().join("mirror"));

    let score = pipeline.get_or_compute(&caption);
    assert_eq!(score.polarity, -1.0);
    assert_eq!(score.computed_at_revision, 1);

    let annotation = pipeline.annotate("photo-2", &[caption]);
    assert!(annotation.moderation.flagged);
}

#[test]
fn test_corrupt_lexicon_scores_neutral() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = dir.path().join("mirror");
    std::fs::create_dir_all(&mirror).unwrap();
    std::fs::write(mirror.join(format!("{LEXICON_CORPUS}.txt")), "awful\tvery\tbad\n").unwrap();
    std::fs::write(mirror.join(format!("{TOKENIZER_CORPUS}.txt")), RULES).unwrap();

    let (_provisioner, pipeline) = offline_pipeline(dir.path());
    assert_eq!(pipeline.warm_up(), ProvisionState::Ready);
    assert_eq!(pipeline.score_text("awful"), SentimentScore::NEUTRAL);
}

#[test]
fn test_scores_stay_in_range() {
    let gate = Arc::new(FixedGate::new(ProvisionState::Ready));
    for (p, s) in [(-7.0, 3.0), (7.0, -3.0), (f64::NAN, f64::NAN), (0.25, 0.75)] {
        let scorer = SentimentScorer::new(gate.clone(), Arc::new(FixedModel::new(p, s)));
        let score = scorer.score("anything at all");
        assert!((-1.0..=1.0).contains(&score.polarity));
        assert!((0.0..=1.0).contains(&score.subjectivity));
    }
}

#[test]
fn test_provisioning_in_progress_is_neutral() {
    let gate = Arc::new(FixedGate::new(ProvisionState::Provisioning));
    let model = Arc::new(FixedModel::new(-0.9, 0.9));
    let scorer = SentimentScorer::new(gate, model.clone());
    assert_eq!(scorer.score("awful"), SentimentScore::NEUTRAL);
    assert_eq!(model.calls(), 0);
}
