//! # kokoro-speak
//!
//! Text-to-speech for plain text files using the Kokoro engine: read a file,
//! synthesize every line, then play the audio live or save it as a WAV file.
//!
//! The crate is split into three layers:
//!
//! - [`engines`] — the Kokoro ONNX engine (behind the `kokoro` feature),
//! - [`pipeline`] — the file-to-audio driver, written against the
//!   [`SpeechSynthesizer`] and [`sink::AudioSink`] traits so it can be tested
//!   without a model or a sound card,
//! - [`sink`] — the WAV file sink and, behind the `playback` feature, the
//!   speaker sink.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use kokoro_speak::engines::kokoro::{KokoroEngine, KokoroOptions};
//! use kokoro_speak::pipeline::{self, PipelineConfigBuilder};
//! use kokoro_speak::sink::WavSink;
//!
//! let config = PipelineConfigBuilder::default()
//!     .input(PathBuf::from("chapter1.txt"))
//!     .build()?;
//! let mut engine = KokoroEngine::load(&PathBuf::from("models/kokoro"), KokoroOptions::default())?;
//! let mut sink = WavSink::new(config.output.clone());
//! pipeline::run(&config, &mut engine, &mut sink)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;
pub mod pipeline;
pub mod sink;

/// Output sample rate of the Kokoro model, shared by every segment.
pub const SAMPLE_RATE: u32 = 24000;

/// One unit of audio produced by a single synthesis call.
///
/// A call may yield several segments (long inputs are chunked); segments are
/// concatenated in order by the pipeline, never resampled or padded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    /// Mono audio samples as f32 values at [`SAMPLE_RATE`].
    pub samples: Vec<f32>,
}

impl AudioSegment {
    /// Duration of this segment in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }
}

/// Narrow capability interface over a text-to-speech pipeline.
///
/// The real implementation is `engines::kokoro::KokoroEngine`; the pipeline
/// driver only sees this trait, so tests substitute a scripted fake.
pub trait SpeechSynthesizer {
    /// Synthesize speech for `text`, returning the ordered audio segments.
    fn synthesize(&mut self, text: &str) -> Result<Vec<AudioSegment>, Box<dyn std::error::Error>>;

    /// Fixed sample rate of every segment this synthesizer produces.
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioSegment, SAMPLE_RATE};

    #[test]
    fn segment_duration_follows_sample_count() {
        let one_second = AudioSegment {
            samples: vec![0.0; SAMPLE_RATE as usize],
        };
        assert!((one_second.duration_secs() - 1.0).abs() < 1e-12);

        let empty = AudioSegment { samples: Vec::new() };
        assert_eq!(empty.duration_secs(), 0.0);
    }
}
