use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::voices::STYLE_DIM;
use super::KokoroError;

/// Maximum phoneme tokens per inference call, excluding the two pad tokens.
pub const MAX_TOKENS: usize = 510;

/// Kokoro ONNX session with the input quirks of published exports resolved.
pub struct KokoroSession {
    session: Session,
    /// "input_ids" or "tokens", depending on the export.
    tokens_input: String,
    /// Some exports take the speed input as int32 rather than f32.
    speed_is_int32: bool,
}

impl KokoroSession {
    /// Load the `.onnx` model found in `model_dir` onto the CPU provider.
    pub fn load(model_dir: &Path, threads: Option<usize>) -> Result<Self, KokoroError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(vec![CPUExecutionProvider::default().build()])?
            .with_parallel_execution(true)?;
        if let Some(threads) = threads {
            builder = builder
                .with_intra_threads(threads)?
                .with_inter_threads(threads)?;
        }
        let session = builder.commit_from_file(&onnx_path)?;

        let mut tokens_input = "input_ids".to_string();
        // Modern Kokoro exports use int32 speed.
        let mut speed_is_int32 = true;
        for input in &session.inputs {
            if input.name == "input_ids" || input.name == "tokens" {
                tokens_input = input.name.to_string();
            }
            if input.name == "speed" {
                speed_is_int32 = format!("{:?}", input.input_type)
                    .to_ascii_lowercase()
                    .contains("int32");
            }
        }
        log::debug!("Session inputs: tokens='{tokens_input}', speed_is_int32={speed_is_int32}");

        Ok(Self {
            session,
            tokens_input,
            speed_is_int32,
        })
    }

    /// Run one inference call: token IDs plus a style vector in, samples out.
    pub fn infer(
        &mut self,
        tokens: &[i64],
        style: &[f32],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // The model expects a zero pad token on both ends.
        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(0);
        padded.extend_from_slice(tokens);
        padded.push(0);
        let len = padded.len();
        let tokens_arr = Array2::from_shape_vec((1, len), padded)?;
        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style)?;

        let outputs = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[speed as i32]);
            self.session.run(inputs![
                self.tokens_input.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            self.session.run(inputs![
                self.tokens_input.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let (_, waveform) = outputs
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("model produced no outputs")))?;
        let samples = waveform.try_extract_array::<f32>()?;
        Ok(samples.as_slice().unwrap_or(&[]).to_vec())
    }
}

/// Locate the `.onnx` file inside the model directory.
///
/// The quantized ConvInteger export is preferred when present; otherwise any
/// `.onnx` file is picked by name order.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = model_dir.join("kokoro-quant-convinteger.onnx");
    if preferred.is_file() {
        return Ok(preferred);
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("onnx"))
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        KokoroError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no .onnx file found in {}", model_dir.display()),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::find_onnx_file;
    use std::path::PathBuf;

    fn temp_model_dir(name: &str, files: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kokoro-speak-session-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create temp model dir");
        for file in files {
            std::fs::write(dir.join(file), b"onnx").expect("write model file");
        }
        dir
    }

    #[test]
    fn prefers_the_quantized_export() {
        let dir = temp_model_dir(
            "preferred",
            &["aaa.onnx", "kokoro-quant-convinteger.onnx", "zzz.onnx"],
        );
        let found = find_onnx_file(&dir).expect("should find a model");
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(found, dir.join("kokoro-quant-convinteger.onnx"));
    }

    #[test]
    fn falls_back_to_first_onnx_by_name() {
        let dir = temp_model_dir("fallback", &["model-b.onnx", "model-a.onnx", "notes.txt"]);
        let found = find_onnx_file(&dir).expect("should find a model");
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(found, dir.join("model-a.onnx"));
    }

    #[test]
    fn missing_model_is_reported() {
        let dir = temp_model_dir("empty", &["config.json"]);
        let err = find_onnx_file(&dir).expect_err("no .onnx should fail");
        std::fs::remove_dir_all(&dir).ok();

        assert!(err.to_string().contains("no .onnx file"));
    }
}
