//! SnapSense CLI
//!
//! The `snapsense` command is run by the deployment script before workers
//! start, and by operators checking how a piece of text scores.
//!
//! ## Commands
//!
//! - `provision`: Fetch every corpus into the data directory
//! - `score`: Score texts and show the moderation outcome
//! - `status`: Show on-disk corpus markers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corpus_provisioner::{CorpusStore, ProvisionMarker, ProvisionState};
use serde::Serialize;
use snapsense_core::metrics::METRICS;
use snapsense_core::{
    init_tracing, moderation, CommentVerdict, LogFormat, PipelineConfig, SentimentPipeline,
};
use tracing::{warn, Level};

#[derive(Parser)]
#[command(name = "snapsense")]
#[command(author = "SnapSense Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sentiment scoring pipeline for photo captions and comments", long_about = None)]
struct Cli {
    /// JSON config file; environment variables override it
    #[arg(long, global = true, env = "SNAPSENSE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding provisioned corpora
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Provision from this local mirror instead of the corpus repository
    #[arg(long, global = true)]
    corpus_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision every corpus into the data directory
    Provision {
        /// Exit non-zero when provisioning fails
        #[arg(long)]
        strict: bool,
    },

    /// Score one or more texts (one JSON line each)
    Score {
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Print on-disk corpus markers as JSON
    Status,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    };
    init_tracing(format, level);

    let config = load_config(&cli)?;

    let result = match cli.command {
        Commands::Provision { strict } => cmd_provision(&config, strict),
        Commands::Score { texts } => cmd_score(&config, &texts),
        Commands::Status => cmd_status(&config),
    };
    METRICS.flush();
    result
}

/// Defaults, then the config file, then `SNAPSENSE_*` variables, then flags.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let base = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let mut config = base
        .merge_env(|key| std::env::var(key).ok())
        .context("Invalid SNAPSENSE_* environment")?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.corpus_dir {
        config.corpus_dir = Some(dir.clone());
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// provision
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ProvisionReport {
    state: ProvisionState,
    data_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn provision(config: &PipelineConfig) -> Result<ProvisionReport> {
    let pipeline =
        SentimentPipeline::from_config(config).context("Failed to build scoring pipeline")?;
    let state = pipeline.warm_up();
    Ok(ProvisionReport {
        state,
        data_dir: config.data_dir.clone(),
        error: pipeline.provision_error(),
    })
}

fn cmd_provision(config: &PipelineConfig, strict: bool) -> Result<()> {
    let report = provision(config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.state.is_ready() {
        if strict {
            anyhow::bail!(
                "corpus provisioning {}: {}",
                report.state,
                report.error.as_deref().unwrap_or("unknown reason")
            );
        }
        // Workers retry on their own; a missing corpus must not block deploys.
        warn!(event = "provision.deferred", state = %report.state);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// score
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ScoreLine {
    text: String,
    polarity: f64,
    subjectivity: f64,
    flagged: bool,
    rank_weight: f64,
    comment: CommentVerdict,
}

fn score_lines(pipeline: &SentimentPipeline, texts: &[String]) -> Vec<ScoreLine> {
    texts
        .iter()
        .map(|text| {
            let score = pipeline.score_text(text);
            let moderation = pipeline.evaluate(&[score]);
            ScoreLine {
                text: text.clone(),
                polarity: score.polarity,
                subjectivity: score.subjectivity,
                flagged: moderation.flagged,
                rank_weight: moderation.rank_weight,
                comment: moderation::screen_comment(pipeline.policy(), &score),
            }
        })
        .collect()
}

fn cmd_score(config: &PipelineConfig, texts: &[String]) -> Result<()> {
    let pipeline =
        SentimentPipeline::from_config(config).context("Failed to build scoring pipeline")?;
    let state = pipeline.warm_up();
    if !state.is_ready() {
        eprintln!("warning: corpora {state}; scores below are neutral");
    }
    for line in score_lines(&pipeline, texts) {
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CorpusStatus {
    corpus: String,
    path: PathBuf,
    provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<ProvisionMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn corpus_statuses(config: &PipelineConfig) -> Vec<CorpusStatus> {
    let provisioner = config.provisioner();
    let store = CorpusStore::new(&provisioner.data_dir);
    provisioner
        .corpora
        .iter()
        .map(|corpus| {
            let (marker, marker_err) = match store.read_marker(corpus) {
                Ok(marker) => (marker, None),
                Err(err) => (None, Some(err.to_string())),
            };
            let (provisioned, check_err) = match store.is_provisioned(corpus) {
                Ok(ok) => (ok, None),
                Err(err) => (false, Some(err.to_string())),
            };
            CorpusStatus {
                corpus: corpus.clone(),
                path: store.data_path(corpus),
                provisioned,
                marker,
                error: marker_err.or(check_err),
            }
        })
        .collect()
}

fn cmd_status(config: &PipelineConfig) -> Result<()> {
    let statuses = corpus_statuses(config);
    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(())
}
