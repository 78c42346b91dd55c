//! Pipeline configuration.
//!
//! Every field has a default suited to a single photo-app worker and can be
//! overridden from a JSON file or from `SNAPSENSE_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use corpus_provisioner::{ProvisionerConfig, DEFAULT_CORPUS_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::domain::ConfigError;
use crate::moderation::ModerationPolicy;
use crate::scorer::DEFAULT_MAX_TEXT_CHARS;

/// Everything needed to build a [`SentimentPipeline`](crate::SentimentPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where provisioned corpora live; shared by all workers on a machine
    pub data_dir: PathBuf,
    /// Corpus repository base URL
    pub corpus_base_url: String,
    /// Local mirror to provision from instead of HTTP
    pub corpus_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    pub lock_timeout_secs: u64,
    pub retry_backoff_secs: u64,
    pub cache_capacity: usize,
    pub max_text_chars: usize,
    pub flag_polarity_below: f64,
    pub flag_subjectivity_above: f64,
    pub comment_block_below: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let policy = ModerationPolicy::default();
        Self {
            data_dir: PathBuf::from("instance/corpora"),
            corpus_base_url: DEFAULT_CORPUS_BASE_URL.to_string(),
            corpus_dir: None,
            fetch_timeout_secs: 10,
            lock_timeout_secs: 15,
            retry_backoff_secs: 0,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            flag_polarity_below: policy.negative_threshold,
            flag_subjectivity_above: policy.subjectivity_threshold,
            comment_block_below: policy.comment_block_threshold,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by any `SNAPSENSE_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SNAPSENSE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SNAPSENSE_CORPUS_URL") {
            self.corpus_base_url = v;
        }
        if let Some(v) = lookup("SNAPSENSE_CORPUS_DIR") {
            self.corpus_dir = Some(PathBuf::from(v));
        }
        parse_into(&lookup, "SNAPSENSE_FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs)?;
        parse_into(&lookup, "SNAPSENSE_LOCK_TIMEOUT_SECS", &mut self.lock_timeout_secs)?;
        parse_into(&lookup, "SNAPSENSE_RETRY_BACKOFF_SECS", &mut self.retry_backoff_secs)?;
        parse_into(&lookup, "SNAPSENSE_CACHE_CAPACITY", &mut self.cache_capacity)?;
        parse_into(&lookup, "SNAPSENSE_MAX_TEXT_CHARS", &mut self.max_text_chars)?;
        parse_into(&lookup, "SNAPSENSE_FLAG_POLARITY", &mut self.flag_polarity_below)?;
        parse_into(&lookup, "SNAPSENSE_FLAG_SUBJECTIVITY", &mut self.flag_subjectivity_above)?;
        parse_into(&lookup, "SNAPSENSE_COMMENT_BLOCK", &mut self.comment_block_below)?;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(out_of_range("cache_capacity", "must be at least 1"));
        }
        if self.max_text_chars == 0 {
            return Err(out_of_range("max_text_chars", "must be at least 1"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(out_of_range("fetch_timeout_secs", "must be at least 1"));
        }
        for (field, value) in [
            ("flag_polarity_below", self.flag_polarity_below),
            ("comment_block_below", self.comment_block_below),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(out_of_range(field, "must be within [-1, 1]"));
            }
        }
        if !(0.0..=1.0).contains(&self.flag_subjectivity_above) {
            return Err(out_of_range(
                "flag_subjectivity_above",
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }

    /// Provisioner settings derived from this config.
    pub fn provisioner(&self) -> ProvisionerConfig {
        ProvisionerConfig::new(&self.data_dir)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout_secs))
            .with_lock_timeout(Duration::from_secs(self.lock_timeout_secs))
            .with_retry_backoff(Duration::from_secs(self.retry_backoff_secs))
    }

    /// Moderation thresholds derived from this config.
    pub fn policy(&self) -> ModerationPolicy {
        ModerationPolicy::default()
            .with_negative_threshold(self.flag_polarity_below)
            .with_subjectivity_threshold(self.flag_subjectivity_above)
            .with_comment_block_threshold(self.comment_block_below)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn out_of_range(field: &str, reason: &str) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.policy(), ModerationPolicy::default());
        assert_eq!(cfg.provisioner().retry_backoff, Duration::ZERO);
    }

    #[test]
    fn env_overrides_apply() {
        let cfg = PipelineConfig::default()
            .merge_env(env(&[
                ("SNAPSENSE_DATA_DIR", "/srv/app/instance/corpora"),
                ("SNAPSENSE_CACHE_CAPACITY", "256"),
                ("SNAPSENSE_FLAG_POLARITY", "-0.7"),
                ("SNAPSENSE_CORPUS_DIR", "/opt/mirror"),
            ]))
            .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/app/instance/corpora"));
        assert_eq!(cfg.cache_capacity, 256);
        assert_eq!(cfg.policy().negative_threshold, -0.7);
        assert_eq!(cfg.corpus_dir, Some(PathBuf::from("/opt/mirror")));
    }

    #[test]
    fn unparsable_env_value_names_the_key() {
        let err = PipelineConfig::default()
            .merge_env(env(&[("SNAPSENSE_CACHE_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("SNAPSENSE_CACHE_CAPACITY"));
    }

    #[test]
    fn out_of_range_thresholds_rejected() {
        assert!(PipelineConfig::default()
            .merge_env(env(&[("SNAPSENSE_FLAG_SUBJECTIVITY", "1.5")]))
            .is_err());
        assert!(PipelineConfig::default()
            .merge_env(env(&[("SNAPSENSE_CACHE_CAPACITY", "0")]))
            .is_err());
    }

    #[test]
    fn file_config_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapsense.json");
        std::fs::write(&path, r#"{ "cache_capacity": 64, "max_text_chars": 500 }"#).unwrap();

        let cfg = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.cache_capacity, 64);
        assert_eq!(cfg.max_text_chars, 500);
        assert_eq!(cfg.lock_timeout_secs, 15);
    }
}
