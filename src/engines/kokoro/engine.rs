use std::path::Path;

use crate::{AudioSegment, SpeechSynthesizer, SAMPLE_RATE};

use super::phonemize;
use super::session::{KokoroSession, MAX_TOKENS};
use super::vocab::Vocab;
use super::voices::VoiceStore;
use super::KokoroError;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

/// Options fixed for the lifetime of a [`KokoroEngine`].
#[derive(Debug, Clone)]
pub struct KokoroOptions {
    /// Voice name, e.g. `"af_heart"` or `"bf_emma"`.
    pub voice: String,
    /// Kokoro language code (`a`, `b`, `e`, `f`, `h`, `i`, `j`, `p`, `z`).
    pub lang: String,
    /// Speech speed multiplier, [`MIN_SPEED`]..[`MAX_SPEED`].
    pub speed: f32,
    /// Inference thread override; `None` leaves the choice to ort.
    pub threads: Option<usize>,
}

impl Default for KokoroOptions {
    fn default() -> Self {
        Self {
            voice: "af_heart".to_string(),
            lang: "a".to_string(),
            speed: 1.0,
            threads: None,
        }
    }
}

/// Kokoro text-to-speech engine.
///
/// Construction loads the ONNX model, the voice style archive, and the
/// vocabulary from one model directory, and resolves the espeak-ng voice for
/// the requested language, so that every later synthesis call can only fail
/// on phonemization or inference.
pub struct KokoroEngine {
    session: KokoroSession,
    voices: VoiceStore,
    vocab: Vocab,
    voice: String,
    espeak_voice: &'static str,
    speed: f32,
}

impl KokoroEngine {
    /// Load the engine from a model directory.
    pub fn load(model_dir: &Path, options: KokoroOptions) -> Result<Self, KokoroError> {
        if !options.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&options.speed) {
            return Err(KokoroError::InvalidSpeed(options.speed));
        }

        let session = KokoroSession::load(model_dir, options.threads)?;
        let vocab = Vocab::load(&model_dir.join("config.json"))?;
        let voices = VoiceStore::load(&model_dir.join("voices-v1.0.bin"))?;
        if !voices.contains(&options.voice) {
            return Err(KokoroError::VoiceNotFound(options.voice));
        }

        let espeak_voice = phonemize::espeak_voice(&options.lang, &options.voice);
        log::info!(
            "Kokoro ready: voice={}, espeak voice={espeak_voice}, speed={}",
            options.voice,
            options.speed
        );

        Ok(Self {
            session,
            voices,
            vocab,
            voice: options.voice,
            espeak_voice,
            speed: options.speed,
        })
    }

    /// All voice names available in the loaded archive.
    pub fn available_voices(&self) -> Vec<&str> {
        self.voices.names()
    }
}

impl SpeechSynthesizer for KokoroEngine {
    fn synthesize(&mut self, text: &str) -> Result<Vec<AudioSegment>, Box<dyn std::error::Error>> {
        let chunks = phonemize::to_token_chunks(text, self.espeak_voice, &self.vocab, MAX_TOKENS)?;
        if chunks.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(Vec::new());
        }

        // Style row is keyed by the full token count and held constant across
        // chunks so prosody does not change at chunk boundaries.
        let style_index = chunks.iter().map(Vec::len).sum();

        let mut segments = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let style = self.voices.style(&self.voice, style_index)?;
            let samples = self.session.infer(chunk, style, self.speed)?;
            if samples.is_empty() {
                continue;
            }
            segments.push(AudioSegment { samples });
        }
        Ok(segments)
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}
