//! Audio sinks: where the combined sample buffer ends up.

use std::error::Error;
use std::path::PathBuf;

/// Narrow capability interface over an audio destination.
///
/// The pipeline calls [`AudioSink::consume`] exactly once per run, with the
/// full concatenated buffer.
pub trait AudioSink {
    fn consume(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), Box<dyn Error>>;
}

/// Writes the buffer as a mono 32-bit float WAV file.
pub struct WavSink {
    path: PathBuf,
}

impl WavSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AudioSink for WavSink {
    fn consume(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), Box<dyn Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&self.path, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        log::info!("Wrote {} samples to {}", samples.len(), self.path.display());
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use speaker::SpeakerSink;

#[cfg(feature = "playback")]
mod speaker {
    use super::AudioSink;
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};
    use std::error::Error;

    /// Plays the buffer on the default output device and blocks until done.
    pub struct SpeakerSink;

    impl AudioSink for SpeakerSink {
        fn consume(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), Box<dyn Error>> {
            // Stream and sink are scoped locals, so the device is released on
            // every exit path, including failures below.
            let (_stream, handle) = OutputStream::try_default()?;
            let sink = Sink::try_new(&handle)?;
            sink.append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));
            sink.sleep_until_end();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioSink, WavSink};
    use std::path::PathBuf;

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kokoro-speak-sink-{}-{name}.wav", std::process::id()))
    }

    #[test]
    fn wav_sink_round_trips_samples() {
        let path = temp_wav("roundtrip");
        let samples = vec![0.0_f32, 0.25, -0.25, 1.0, -1.0];

        WavSink::new(path.clone())
            .consume(&samples, 24000)
            .expect("wav write should succeed");

        let mut reader = hound::WavReader::open(&path).expect("wav should open");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);

        let read_back: Vec<f32> = reader
            .samples::<f32>()
            .map(|s| s.expect("sample should decode"))
            .collect();
        std::fs::remove_file(&path).ok();
        assert_eq!(read_back, samples);
    }

    #[test]
    fn wav_sink_fails_on_unwritable_path() {
        let mut sink = WavSink::new(PathBuf::from("/nonexistent/dir/out.wav"));
        assert!(sink.consume(&[0.0], 24000).is_err());
    }
}
