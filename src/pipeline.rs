//! The file-to-audio pipeline driver.
//!
//! Reads a text file, synthesizes every non-blank line through a
//! [`SpeechSynthesizer`], concatenates the resulting segments in order, and
//! hands the combined buffer to an [`AudioSink`] exactly once. Every failure
//! is terminal; there is no retry or partial-success path.

use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::sink::AudioSink;
use crate::{AudioSegment, SpeechSynthesizer};

pub const DEFAULT_OUTPUT: &str = "output.wav";
pub const DEFAULT_VOICE: &str = "af_heart";
pub const DEFAULT_LANG: &str = "a";

/// Resolved per-run configuration. Defaults match the CLI surface.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct PipelineConfig {
    /// Text file to synthesize.
    pub input: PathBuf,
    /// WAV file written when `play` is false.
    #[builder(default = "PathBuf::from(DEFAULT_OUTPUT)")]
    pub output: PathBuf,
    /// Voice name passed to the engine.
    #[builder(default = "DEFAULT_VOICE.to_string()")]
    pub voice: String,
    /// Kokoro language code passed to the engine.
    #[builder(default = "DEFAULT_LANG.to_string()")]
    pub lang: String,
    /// Play on the default output device instead of saving.
    #[builder(default)]
    pub play: bool,
    /// Speech speed multiplier.
    #[builder(default = "1.0")]
    pub speed: f32,
}

/// Terminal failures of a pipeline run, one variant per failure class.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("input file '{}' not found", .0.display())]
    InputNotFound(PathBuf),
    #[error("failed to read input file '{}': {}", .path.display(), .source)]
    InputUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("output must be a .wav file: {}", .0.display())]
    InvalidOutputExtension(PathBuf),
    #[error("audio generation failed: {0}")]
    Synthesis(Box<dyn std::error::Error>),
    #[error("no audio segments were generated")]
    NoAudio,
    #[error("audio output failed: {0}")]
    Sink(Box<dyn std::error::Error>),
}

/// What a successful run produced.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Total samples handed to the sink.
    pub samples: usize,
    /// Audio duration in seconds.
    pub duration_secs: f64,
}

/// Reject output paths that are not WAV files.
///
/// Called before the engine is constructed so a bad path never triggers
/// synthesis.
pub fn validate_output_path(path: &Path) -> Result<(), PipelineError> {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        Ok(())
    } else {
        Err(PipelineError::InvalidOutputExtension(path.to_path_buf()))
    }
}

/// Run the pipeline: read, synthesize line by line, concatenate, sink.
pub fn run(
    config: &PipelineConfig,
    synthesizer: &mut dyn SpeechSynthesizer,
    sink: &mut dyn AudioSink,
) -> Result<RunSummary, PipelineError> {
    let text = read_input(&config.input)?;

    let mut samples: Vec<f32> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let segments = synthesizer
            .synthesize(line)
            .map_err(PipelineError::Synthesis)?;
        let line_secs: f64 = segments.iter().map(AudioSegment::duration_secs).sum();
        log::debug!("Line produced {} segment(s), {line_secs:.2}s", segments.len());
        for segment in segments {
            samples.extend_from_slice(&segment.samples);
        }
    }

    // Applies to playback as well as save mode: an empty buffer is reported,
    // never handed to a device or written as a zero-length file.
    if samples.is_empty() {
        return Err(PipelineError::NoAudio);
    }

    let sample_rate = synthesizer.sample_rate();
    let summary = RunSummary {
        samples: samples.len(),
        duration_secs: samples.len() as f64 / sample_rate as f64,
    };
    log::info!(
        "Synthesized {:.2}s of audio ({} samples)",
        summary.duration_secs,
        summary.samples
    );

    sink.consume(&samples, sample_rate).map_err(PipelineError::Sink)?;
    Ok(summary)
}

fn read_input(path: &Path) -> Result<String, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| PipelineError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioSegment, SpeechSynthesizer, SAMPLE_RATE};
    use std::io::Write;
    use std::path::PathBuf;

    /// Scripted synthesizer: records the texts it was asked to speak and
    /// yields one fixed-length segment per call, tagged by call order.
    struct FakeSynthesizer {
        calls: Vec<String>,
        samples_per_call: usize,
    }

    impl FakeSynthesizer {
        fn new(samples_per_call: usize) -> Self {
            Self {
                calls: Vec::new(),
                samples_per_call,
            }
        }
    }

    impl SpeechSynthesizer for FakeSynthesizer {
        fn synthesize(
            &mut self,
            text: &str,
        ) -> Result<Vec<AudioSegment>, Box<dyn std::error::Error>> {
            let tag = self.calls.len() as f32;
            self.calls.push(text.to_string());
            Ok(vec![AudioSegment {
                samples: vec![tag; self.samples_per_call],
            }])
        }
    }

    /// Sink that captures what it was given.
    #[derive(Default)]
    struct CaptureSink {
        consumed: Option<(Vec<f32>, u32)>,
    }

    impl AudioSink for CaptureSink {
        fn consume(
            &mut self,
            samples: &[f32],
            sample_rate: u32,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.consumed = Some((samples.to_vec(), sample_rate));
            Ok(())
        }
    }

    fn write_temp_input(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "kokoro-speak-pipeline-{}-{name}.txt",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).expect("create temp input");
        file.write_all(content.as_bytes()).expect("write temp input");
        path
    }

    fn config_for(input: PathBuf) -> PipelineConfig {
        PipelineConfigBuilder::default()
            .input(input)
            .build()
            .expect("config should build")
    }

    #[test]
    fn builder_defaults_match_cli_defaults() {
        let config = config_for(PathBuf::from("in.txt"));
        assert_eq!(config.output, PathBuf::from("output.wav"));
        assert_eq!(config.voice, "af_heart");
        assert_eq!(config.lang, "a");
        assert!(!config.play);
        assert_eq!(config.speed, 1.0);
    }

    #[test]
    fn synthesizes_each_nonblank_line_with_its_own_text() {
        let path = write_temp_input("lines", "first line\n\n  \nsecond line\nthird\n");
        let mut synth = FakeSynthesizer::new(4);
        let mut sink = CaptureSink::default();

        run(&config_for(path.clone()), &mut synth, &mut sink).expect("run should succeed");
        std::fs::remove_file(&path).ok();

        assert_eq!(synth.calls, vec!["first line", "second line", "third"]);
    }

    #[test]
    fn concatenation_preserves_segment_order() {
        let path = write_temp_input("order", "a\nb\nc\n");
        let mut synth = FakeSynthesizer::new(2);
        let mut sink = CaptureSink::default();

        let summary =
            run(&config_for(path.clone()), &mut synth, &mut sink).expect("run should succeed");
        std::fs::remove_file(&path).ok();

        let (samples, rate) = sink.consumed.expect("sink should be fed");
        assert_eq!(samples, vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(rate, SAMPLE_RATE);
        assert_eq!(summary.samples, 6);
        assert!((summary.duration_secs - 6.0 / SAMPLE_RATE as f64).abs() < 1e-12);
    }

    #[test]
    fn blank_only_input_reports_no_audio_and_skips_sink() {
        let path = write_temp_input("blank", "\n   \n\t\n");
        let mut synth = FakeSynthesizer::new(4);
        let mut sink = CaptureSink::default();

        let err = run(&config_for(path.clone()), &mut synth, &mut sink)
            .expect_err("blank input should fail");
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, PipelineError::NoAudio));
        assert!(synth.calls.is_empty());
        assert!(sink.consumed.is_none());
    }

    #[test]
    fn missing_input_is_reported_before_synthesis() {
        let mut synth = FakeSynthesizer::new(4);
        let mut sink = CaptureSink::default();
        let config = config_for(PathBuf::from("/nonexistent/input.txt"));

        let err = run(&config, &mut synth, &mut sink).expect_err("missing input should fail");

        assert!(matches!(err, PipelineError::InputNotFound(_)));
        assert!(synth.calls.is_empty());
        assert!(sink.consumed.is_none());
    }

    #[test]
    fn non_utf8_input_is_unreadable() {
        let path = std::env::temp_dir().join(format!(
            "kokoro-speak-pipeline-{}-binary.txt",
            std::process::id()
        ));
        std::fs::write(&path, [0xff_u8, 0xfe, 0x00, 0x80]).expect("write binary input");

        let mut synth = FakeSynthesizer::new(4);
        let mut sink = CaptureSink::default();
        let err = run(&config_for(path.clone()), &mut synth, &mut sink)
            .expect_err("binary input should fail");
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, PipelineError::InputUnreadable { .. }));
        assert!(synth.calls.is_empty());
        assert!(sink.consumed.is_none());
    }

    #[test]
    fn synthesis_failure_aborts_the_run() {
        struct FailingSynthesizer;
        impl SpeechSynthesizer for FailingSynthesizer {
            fn synthesize(
                &mut self,
                _text: &str,
            ) -> Result<Vec<AudioSegment>, Box<dyn std::error::Error>> {
                Err("engine exploded".into())
            }
        }

        let path = write_temp_input("failing", "some text\n");
        let mut sink = CaptureSink::default();

        let err = run(&config_for(path.clone()), &mut FailingSynthesizer, &mut sink)
            .expect_err("synthesis failure should abort");
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, PipelineError::Synthesis(_)));
        assert!(sink.consumed.is_none());
    }

    #[test]
    fn output_path_must_end_in_wav() {
        assert!(validate_output_path(Path::new("speech.wav")).is_ok());
        assert!(validate_output_path(Path::new("speech.WAV")).is_ok());

        for bad in ["speech.mp3", "speech", "wav"] {
            let err = validate_output_path(Path::new(bad)).expect_err("should be rejected");
            assert!(matches!(err, PipelineError::InvalidOutputExtension(_)));
        }
    }
}
