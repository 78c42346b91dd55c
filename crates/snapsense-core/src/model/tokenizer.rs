//! Word tokenizer driven by the `tokenizer-rules` corpus.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ModelError;

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:'\p{L}+)*").expect("word pattern is valid"))
}

/// Lowercasing word splitter with contraction expansion.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    contractions: HashMap<String, Vec<String>>,
}

impl Tokenizer {
    pub fn new(contractions: HashMap<String, Vec<String>>) -> Self {
        Self { contractions }
    }

    /// Parse `contraction<TAB>expansion` lines. `#` starts a comment line.
    pub fn from_rules(corpus: &str, raw: &str) -> Result<Self, ModelError> {
        let mut contractions = HashMap::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (from, to) = line.split_once('\t').ok_or_else(|| ModelError::Parse {
                corpus: corpus.to_string(),
                line: idx + 1,
                reason: "expected contraction<TAB>expansion".to_string(),
            })?;
            let expansion: Vec<String> = to.split_whitespace().map(str::to_lowercase).collect();
            if expansion.is_empty() {
                return Err(ModelError::Parse {
                    corpus: corpus.to_string(),
                    line: idx + 1,
                    reason: "empty expansion".to_string(),
                });
            }
            contractions.insert(normalize(from.trim()), expansion);
        }
        Ok(Self { contractions })
    }

    pub fn rule_count(&self) -> usize {
        self.contractions.len()
    }

    /// Split `text` into lowercase word tokens, expanding known contractions.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut tokens = Vec::new();
        for m in word_pattern().find_iter(&normalized) {
            match self.contractions.get(m.as_str()) {
                Some(expansion) => tokens.extend(expansion.iter().cloned()),
                None => tokens.push(m.as_str().to_string()),
            }
        }
        tokens
    }
}

// Lowercase and fold typographic apostrophes into ASCII.
fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'")
}
