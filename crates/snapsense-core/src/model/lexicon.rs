//! Lexicon-based polarity/subjectivity model.
//!
//! Each lexicon line is `word<TAB>polarity<TAB>subjectivity[<TAB>intensity]`.
//! Words with zero polarity and an intensity other than `1.0` are modifiers
//! ("very", "slightly") that scale the next assessed word. Negators flip and
//! dampen the next assessed word. The text's polarity and subjectivity are
//! the means over all assessed words.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use corpus_provisioner::{CorpusProvisioner, LEXICON_CORPUS, TOKENIZER_CORPUS};
use tracing::{debug, info};

use super::tokenizer::Tokenizer;
use super::SentimentModel;
use crate::domain::ModelError;

/// Multiplier applied to the polarity of a negated word.
pub const NEGATION_FACTOR: f64 = -0.5;

const NEGATORS: &[&str] = &["not", "no", "never", "neither", "nor", "without", "hardly"];

/// One lexicon row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexiconEntry {
    pub polarity: f64,
    pub subjectivity: f64,
    pub intensity: f64,
}

impl LexiconEntry {
    fn is_modifier(&self) -> bool {
        self.polarity == 0.0 && self.intensity != 1.0
    }
}

/// Parsed lexicon plus tokenizer; immutable once built.
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: HashMap<String, LexiconEntry>,
    tokenizer: Tokenizer,
}

impl Lexicon {
    pub fn new(entries: HashMap<String, LexiconEntry>, tokenizer: Tokenizer) -> Self {
        Self { entries, tokenizer }
    }

    /// Parse both corpora from their raw text.
    pub fn parse(lexicon_raw: &str, rules_raw: &str) -> Result<Self, ModelError> {
        let tokenizer = Tokenizer::from_rules(TOKENIZER_CORPUS, rules_raw)?;
        let entries = parse_entries(lexicon_raw)?;
        if entries.is_empty() {
            return Err(ModelError::Empty(LEXICON_CORPUS.to_string()));
        }
        Ok(Self { entries, tokenizer })
    }

    /// Read and parse both corpora from disk.
    pub fn load(lexicon_path: &Path, rules_path: &Path) -> Result<Self, ModelError> {
        let lexicon_raw = read_corpus(lexicon_path)?;
        let rules_raw = read_corpus(rules_path)?;
        Self::parse(&lexicon_raw, &rules_raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, word: &str) -> Option<&LexiconEntry> {
        self.entries.get(word)
    }

    /// Mean polarity and subjectivity over assessed words; `(0, 0)` when
    /// no word is in the lexicon. Not clamped.
    pub fn assess(&self, text: &str) -> (f64, f64) {
        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut assessed = 0usize;

        let mut negated = false;
        let mut intensity = 1.0;

        for token in self.tokenizer.tokenize(text) {
            if NEGATORS.contains(&token.as_str()) {
                negated = true;
                continue;
            }
            let Some(entry) = self.entries.get(&token) else {
                continue;
            };
            if entry.is_modifier() {
                intensity *= entry.intensity;
                continue;
            }

            let mut polarity = entry.polarity * intensity;
            if negated {
                polarity *= NEGATION_FACTOR;
            }
            polarity_sum += polarity;
            subjectivity_sum += (entry.subjectivity * intensity).min(1.0);
            assessed += 1;

            negated = false;
            intensity = 1.0;
        }

        if assessed == 0 {
            (0.0, 0.0)
        } else {
            let n = assessed as f64;
            (polarity_sum / n, subjectivity_sum / n)
        }
    }
}

impl SentimentModel for Lexicon {
    fn analyze(&self, text: &str) -> Result<(f64, f64), ModelError> {
        Ok(self.assess(text))
    }
}

fn read_corpus(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ModelError::NotProvisioned
        } else {
            ModelError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn parse_entries(raw: &str) -> Result<HashMap<String, LexiconEntry>, ModelError> {
    let mut entries = HashMap::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_err = |reason: String| ModelError::Parse {
            corpus: LEXICON_CORPUS.to_string(),
            line: idx + 1,
            reason,
        };

        let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cols.len() < 3 || cols.len() > 4 {
            return Err(parse_err(format!("expected 3 or 4 columns, got {}", cols.len())));
        }
        let number = |col: &str, name: &str| -> Result<f64, ModelError> {
            col.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| parse_err(format!("invalid {name}: {col:?}")))
        };

        let entry = LexiconEntry {
            polarity: number(cols[1], "polarity")?.clamp(-1.0, 1.0),
            subjectivity: number(cols[2], "subjectivity")?.clamp(0.0, 1.0),
            intensity: match cols.get(3) {
                Some(col) => number(col, "intensity")?,
                None => 1.0,
            },
        };
        entries.insert(cols[0].to_lowercase(), entry);
    }
    Ok(entries)
}

/// [`Lexicon`] loaded lazily from provisioned corpus files.
///
/// Loading happens on the first `analyze` call and is retried on later calls
/// if it failed, so a worker that starts before provisioning completes picks
/// the data up once it lands.
pub struct LexiconModel {
    lexicon_path: PathBuf,
    rules_path: PathBuf,
    loaded: RwLock<Option<Arc<Lexicon>>>,
}

impl LexiconModel {
    pub fn new(lexicon_path: impl Into<PathBuf>, rules_path: impl Into<PathBuf>) -> Self {
        Self {
            lexicon_path: lexicon_path.into(),
            rules_path: rules_path.into(),
            loaded: RwLock::new(None),
        }
    }

    /// Model reading the files the provisioner writes.
    pub fn from_provisioner(provisioner: &CorpusProvisioner) -> Self {
        Self::new(
            provisioner.resource_path(LEXICON_CORPUS),
            provisioner.resource_path(TOKENIZER_CORPUS),
        )
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn lexicon(&self) -> Result<Arc<Lexicon>, ModelError> {
        if let Some(lexicon) = self
            .loaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(lexicon));
        }

        let mut slot = self.loaded.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(lexicon) = slot.as_ref() {
            return Ok(Arc::clone(lexicon));
        }
        debug!(path = %self.lexicon_path.display(), "loading lexicon");
        let lexicon = Arc::new(Lexicon::load(&self.lexicon_path, &self.rules_path)?);
        info!(
            event = "model.loaded",
            entries = lexicon.len(),
            contractions = lexicon.tokenizer.rule_count(),
        );
        *slot = Some(Arc::clone(&lexicon));
        Ok(lexicon)
    }
}

impl SentimentModel for LexiconModel {
    fn analyze(&self, text: &str) -> Result<(f64, f64), ModelError> {
        Ok(self.lexicon()?.assess(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEXICON: &str = "\
# word\tpolarity\tsubjectivity\tintensity
good\t0.7\t0.6
great\t0.8\t0.75
awful\t-1.0\t1.0
terrible\t-1.0\t1.0
red\t0.0\t0.0
very\t0.0\t0.3\t1.3
slightly\t0.0\t0.2\t0.5
";
    const RULES: &str = "don't\tdo not\nisn't\tis not\n";

    fn lexicon() -> Lexicon {
        Lexicon::parse(LEXICON, RULES).unwrap()
    }

    #[test]
    fn single_word() {
        let (p, s) = lexicon().assess("good");
        assert!((p - 0.7).abs() < 1e-9);
        assert!((s - 0.6).abs() < 1e-9);
    }

    #[test]
    fn mean_over_assessed_words() {
        let (p, s) = lexicon().assess("good photo, awful light");
        assert!((p - (-0.15)).abs() < 1e-9);
        assert!((s - 0.8).abs() < 1e-9);
    }

    #[test]
    fn negation_flips_and_dampens() {
        let (p, _) = lexicon().assess("not good");
        assert!((p - (-0.35)).abs() < 1e-9);

        let (p, _) = lexicon().assess("This isn't a great shot");
        assert!((p - (-0.4)).abs() < 1e-9);
    }

    #[test]
    fn intensifier_scales_next_word() {
        let (p, s) = lexicon().assess("very good");
        assert!((p - 0.91).abs() < 1e-9);
        assert!((s - 0.78).abs() < 1e-9);

        let (p, _) = lexicon().assess("slightly good");
        assert!((p - 0.35).abs() < 1e-9);
    }

    #[test]
    fn neutral_lexicon_words_count_as_assessments() {
        let (p, s) = lexicon().assess("red");
        assert_eq!((p, s), (0.0, 0.0));
        let (p, _) = lexicon().assess("good red");
        assert!((p - 0.35).abs() < 1e-9);
    }

    #[test]
    fn accented_entries_match() {
        let lexicon = Lexicon::parse("magnifique\t0.8\t0.9\nfroid\t-0.2\t0.4\nmédiocre\t-0.6\t0.7\n", RULES)
            .unwrap();
        let (p, s) = lexicon.assess("Un café Médiocre");
        assert!((p - (-0.6)).abs() < 1e-9);
        assert!((s - 0.7).abs() < 1e-9);
    }

    #[test]
    fn no_hits_is_neutral() {
        assert_eq!(lexicon().assess("the pier at dusk"), (0.0, 0.0));
    }

    #[test]
    fn parse_rejects_bad_numbers() {
        let err = Lexicon::parse("good\tvery\t0.5\n", RULES).unwrap_err();
        assert!(err.to_string().contains("polarity"));
        let err = Lexicon::parse("good\t0.5\n", RULES).unwrap_err();
        assert!(matches!(err, ModelError::Parse { line: 1, .. }));
    }

    #[test]
    fn parse_rejects_empty_lexicon() {
        assert!(matches!(
            Lexicon::parse("# nothing\n", RULES),
            Err(ModelError::Empty(_))
        ));
    }

    #[test]
    fn model_reports_missing_files_as_not_provisioned() {
        let dir = tempfile::tempdir().unwrap();
        let model = LexiconModel::new(dir.path().join("lex.txt"), dir.path().join("rules.txt"));
        assert!(matches!(
            model.analyze("good"),
            Err(ModelError::NotProvisioned)
        ));
        assert!(!model.is_loaded());
    }

    #[test]
    fn model_loads_once_files_appear() {
        let dir = tempfile::tempdir().unwrap();
        let lex = dir.path().join("lex.txt");
        let rules = dir.path().join("rules.txt");
        let model = LexiconModel::new(&lex, &rules);
        assert!(model.analyze("good").is_err());

        std::fs::write(&lex, LEXICON).unwrap();
        std::fs::write(&rules, RULES).unwrap();
        let (p, _) = model.analyze("good").unwrap();
        assert!((p - 0.7).abs() < 1e-9);
        assert!(model.is_loaded());
    }
}
