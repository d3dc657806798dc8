use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::KokoroError;

/// The slice of the model's `config.json` this engine cares about.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    vocab: HashMap<String, i64>,
}

/// Mapping from IPA characters (plus punctuation) to model token IDs.
///
/// Loaded from the `"vocab"` object of the model directory's `config.json`;
/// keys must be single-character strings. Published Kokoro exports do not all
/// agree on token IDs, so there is no built-in fallback table.
#[derive(Debug, Clone)]
pub struct Vocab {
    map: HashMap<char, i64>,
}

impl Vocab {
    /// Load the vocabulary from a `config.json` file.
    pub fn load(config_path: &Path) -> Result<Self, KokoroError> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            KokoroError::ConfigInvalid(format!("{}: {e}", config_path.display()))
        })?;
        let config: ModelConfig = serde_json::from_str(&content)
            .map_err(|e| KokoroError::ConfigInvalid(format!("failed to parse JSON: {e}")))?;

        let mut map = HashMap::with_capacity(config.vocab.len());
        for (key, id) in config.vocab {
            let mut chars = key.chars();
            let ch = chars
                .next()
                .ok_or_else(|| KokoroError::ConfigInvalid("empty key in vocab".to_string()))?;
            if chars.next().is_some() {
                return Err(KokoroError::ConfigInvalid(format!(
                    "vocab key {key:?} is not a single character"
                )));
            }
            map.insert(ch, id);
        }

        let vocab = Self { map };
        if vocab.is_empty() {
            return Err(KokoroError::ConfigInvalid(
                "vocab table is empty".to_string(),
            ));
        }
        log::info!("Loaded vocab with {} entries", vocab.len());
        Ok(vocab)
    }

    /// Token ID for `ch`, or `None` if the character is not in the vocabulary.
    pub fn id(&self, ch: char) -> Option<i64> {
        self.map.get(&ch).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
