use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use kokoro_speak::engines::kokoro::{KokoroEngine, KokoroOptions};
use kokoro_speak::pipeline::{self, PipelineConfig, PipelineConfigBuilder, RunSummary};
use kokoro_speak::sink::WavSink;

/// Read a text file aloud with Kokoro, or save the speech as a WAV file.
#[derive(Parser, Debug)]
#[command(name = "kokoro-speak", version)]
struct Cli {
    /// Path to the text file to synthesize
    #[arg(required_unless_present = "list_voices")]
    input_file: Option<PathBuf>,

    /// Output WAV path, used when --play is not given
    #[arg(default_value = pipeline::DEFAULT_OUTPUT)]
    output_file: PathBuf,

    /// Play the audio on the default output device instead of saving it
    #[arg(long)]
    play: bool,

    /// Voice to speak with (e.g. af_heart, bf_emma)
    #[arg(long, default_value = pipeline::DEFAULT_VOICE)]
    voice: String,

    /// Kokoro language code: a/b English, e Spanish, f French, h Hindi,
    /// i Italian, j Japanese, p Portuguese, z Mandarin
    #[arg(long, default_value = pipeline::DEFAULT_LANG)]
    lang: String,

    /// Speech speed multiplier (0.5 to 2.0)
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Directory containing the Kokoro model files
    #[arg(long, value_name = "DIR", default_value = "models/kokoro")]
    model: PathBuf,

    /// Number of inference threads (default: chosen by the runtime)
    #[arg(long)]
    threads: Option<usize>,

    /// List the voices in the model's voice archive and exit
    #[arg(long)]
    list_voices: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.list_voices {
        let options = KokoroOptions {
            threads: cli.threads,
            ..KokoroOptions::default()
        };
        let engine = KokoroEngine::load(&cli.model, options)?;
        for voice in engine.available_voices() {
            println!("{voice}");
        }
        return Ok(());
    }

    let input_file = cli.input_file.ok_or("input file is required")?;
    let config = PipelineConfigBuilder::default()
        .input(input_file)
        .output(cli.output_file)
        .voice(cli.voice)
        .lang(cli.lang)
        .play(cli.play)
        .speed(cli.speed)
        .build()?;

    println!("Using voice: {}", config.voice);
    if config.play {
        println!("Audio will be played after generation.");
    } else {
        // Fail on a bad output path before the model is even loaded.
        pipeline::validate_output_path(&config.output)?;
        println!("Output will be saved to: {}", config.output.display());
    }

    let options = KokoroOptions {
        voice: config.voice.clone(),
        lang: config.lang.clone(),
        speed: config.speed,
        threads: cli.threads,
    };
    let mut engine = KokoroEngine::load(&cli.model, options)?;

    let summary = if config.play {
        play(&config, &mut engine)?
    } else {
        let mut sink = WavSink::new(config.output.clone());
        pipeline::run(&config, &mut engine, &mut sink)?
    };

    println!(
        "Audio generation complete: {:.2}s of audio ({} samples).",
        summary.duration_secs, summary.samples
    );
    Ok(())
}

#[cfg(feature = "playback")]
fn play(
    config: &PipelineConfig,
    engine: &mut KokoroEngine,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    use kokoro_speak::sink::SpeakerSink;

    println!("Starting real-time audio playback...");
    Ok(pipeline::run(config, engine, &mut SpeakerSink)?)
}

#[cfg(not(feature = "playback"))]
fn play(
    _config: &PipelineConfig,
    _engine: &mut KokoroEngine,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    Err("this build has no playback support; rebuild with the `playback` feature".into())
}
