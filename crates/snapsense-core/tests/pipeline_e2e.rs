//! End-to-end: provision the bundled seed corpora from a local mirror, score
//! photo text, and apply moderation.

use std::path::{Path, PathBuf};
use std::thread;

use snapsense_core::{
    CommentVerdict, PipelineConfig, ProvisionState, SentimentPipeline, TextFragment,
};

fn seed_corpora() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../corpora")
}

fn config(data_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        corpus_dir: Some(seed_corpora()),
        ..PipelineConfig::default()
    }
}

fn ready_pipeline(data_dir: &Path) -> SentimentPipeline {
    let pipeline = SentimentPipeline::from_config(&config(data_dir)).unwrap();
    assert_eq!(pipeline.warm_up(), ProvisionState::Ready);
    pipeline
}

#[test]
fn test_strongly_negative_caption_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ready_pipeline(dir.path());

    let annotation = pipeline.annotate(
        "photo-1",
        &[TextFragment::caption("photo-1", "terrible awful day", 1)],
    );
    assert_eq!(annotation.content_id, "photo-1");
    assert_eq!(annotation.scores[0].polarity, -1.0);
    assert_eq!(annotation.scores[0].subjectivity, 1.0);
    assert!(annotation.moderation.flagged);
    assert_eq!(annotation.moderation.rank_weight, 0.0);
}

#[test]
fn test_positive_photo_ranks_high_and_is_not_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ready_pipeline(dir.path());

    let annotation = pipeline.annotate(
        "photo-2",
        &[
            TextFragment::caption("photo-2", "Beautiful sunset, not boring at all", 3),
            TextFragment::comment("photo-2", "What a lovely shot!", 1),
        ],
    );
    assert!(!annotation.moderation.flagged);
    assert!(annotation.moderation.rank_weight > 0.75);
    // beautiful (0.85) and negated boring (-1.0 * -0.5)
    assert!((annotation.scores[0].polarity - 0.675).abs() < 1e-9);
}

#[test]
fn test_negative_fact_is_not_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ready_pipeline(dir.path());

    let score = pipeline.get_or_compute(&TextFragment::caption("photo-3", "rainy and grey", 1));
    assert!(score.polarity < 0.0);
    assert!(!pipeline.evaluate(&[score]).flagged);
}

#[test]
fn test_comment_screening() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ready_pipeline(dir.path());

    assert!(pipeline.screen_comment("this is the worst photo").is_blocked());
    assert_eq!(pipeline.screen_comment("What a lovely shot"), CommentVerdict::Accepted);
    // "don't love" expands to "do not love": 0.5 * -0.5
    assert_eq!(pipeline.screen_comment("I don't love it"), CommentVerdict::Accepted);
    assert_eq!(pipeline.screen_comment(""), CommentVerdict::Accepted);
}

#[test]
fn test_intensifiers_and_contractions() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ready_pipeline(dir.path());

    let plain = pipeline.score_text("good light");
    let boosted = pipeline.score_text("very good light");
    let softened = pipeline.score_text("slightly good light");
    assert!(boosted.polarity > plain.polarity);
    assert!(softened.polarity < plain.polarity);

    let curly = pipeline.score_text("It isn\u{2019}t great");
    let straight = pipeline.score_text("It isn't great");
    assert_eq!(curly, straight);
    assert!(straight.polarity < 0.0);
}

#[test]
fn test_workers_share_one_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("instance/corpora");

    let states: Vec<ProvisionState> = thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let data_dir = data_dir.clone();
                s.spawn(move || {
                    let pipeline = SentimentPipeline::from_config(&config(&data_dir)).unwrap();
                    pipeline.warm_up()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(states.iter().all(|s| *s == ProvisionState::Ready));
    assert!(data_dir.join("polarity-lexicon.txt").exists());
    assert!(data_dir.join("polarity-lexicon.ready").exists());
    assert!(data_dir.join("tokenizer-rules.ready").exists());
}

#[test]
fn test_scoring_is_deterministic_across_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let a = ready_pipeline(dir.path());
    let b = ready_pipeline(dir.path());
    for text in ["gorgeous but crowded", "not bad", "so incredibly boring", "the pier"] {
        assert_eq!(a.score_text(text), b.score_text(text));
        assert_eq!(a.score_text(text), a.score_text(text));
    }
}
