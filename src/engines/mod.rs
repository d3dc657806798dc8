//! Speech synthesis engines.
//!
//! Engines are enabled via Cargo features:
//! - `kokoro` — Kokoro-82M (ONNX format, requires espeak-ng on the system)

#[cfg(feature = "kokoro")]
pub mod kokoro;
