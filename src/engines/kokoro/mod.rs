//! Kokoro-82M text-to-speech engine.
//!
//! Thin inference layer over the Kokoro ONNX export: espeak-ng turns text
//! into IPA, the model vocabulary turns IPA into token IDs, and the ONNX
//! session turns token IDs plus a voice style vector into 24 kHz mono audio.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed and on PATH:
//! - Linux: `sudo apt-get install espeak-ng`
//! - macOS: `brew install espeak-ng`
//! - Windows: installer from <https://espeak-ng.org/download>
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro/
//! ├── kokoro-quant-convinteger.onnx   # or any other .onnx export
//! ├── voices-v1.0.bin                 # voice style archive (.npz)
//! └── config.json                     # model config with the "vocab" table
//! ```
//!
//! Voices are named `{lang_prefix}_{name}` (`af_heart`, `bf_emma`,
//! `jf_alpha`, ...); the two-letter prefix encodes the language. The CLI's
//! single-letter `--lang` codes (`a`, `b`, `e`, `f`, `h`, `i`, `j`, `p`, `z`)
//! select the espeak-ng voice used for phonemization.

pub mod engine;
pub mod phonemize;
pub mod session;
pub mod vocab;
pub mod voices;

pub use engine::{KokoroEngine, KokoroOptions};

/// Errors produced while loading or running the Kokoro engine.
#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found on PATH. Install it: Linux `sudo apt-get install espeak-ng`, \
         macOS `brew install espeak-ng`, Windows https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("voice '{0}' not found in the voice archive")]
    VoiceNotFound(String),
    #[error("invalid config.json: {0}")]
    ConfigInvalid(String),
    #[error("invalid voice archive: {0}")]
    VoiceParse(String),
    #[error("speed {0} out of range (0.5..2.0)")]
    InvalidSpeed(f32),
}
