use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::KokoroError;

/// Length of a Kokoro voice style vector.
pub const STYLE_DIM: usize = 256;

/// Style vectors for one voice, one row per phoneme token count.
#[derive(Debug, Clone)]
struct StyleTable {
    rows: usize,
    data: Vec<f32>,
}

impl StyleTable {
    fn row(&self, index: usize) -> &[f32] {
        // Clamp so any token count maps to a valid row.
        let clamped = index.min(self.rows - 1);
        &self.data[clamped * STYLE_DIM..(clamped + 1) * STYLE_DIM]
    }
}

/// All voice style vectors from a `voices-v1.0.bin` archive.
///
/// The archive is a `.npz` file (zip of `.npy` entries), one entry per voice
/// named `{voice}.npy`, each a little-endian f32 array of shape
/// `[N, 256]`.
pub struct VoiceStore {
    voices: HashMap<String, StyleTable>,
}

impl VoiceStore {
    /// Load every voice from the `.npz` archive at `path`.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        if !path.is_file() {
            return Err(KokoroError::VoiceParse(format!(
                "voice archive not found at {}; download it from the Kokoro model repository",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| KokoroError::VoiceParse(format!("not a zip archive: {e}")))?;

        let mut voices = HashMap::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| KokoroError::VoiceParse(format!("bad zip entry {i}: {e}")))?;
            let entry_name = entry.name().to_string();
            let Some(voice_name) = entry_name.strip_suffix(".npy") else {
                continue;
            };

            let mut raw = Vec::new();
            entry
                .read_to_end(&mut raw)
                .map_err(|e| KokoroError::VoiceParse(format!("failed reading {entry_name}: {e}")))?;
            let table = parse_npy(&raw)
                .map_err(|e| KokoroError::VoiceParse(format!("{entry_name}: {e}")))?;
            voices.insert(voice_name.to_string(), table);
        }

        if voices.is_empty() {
            return Err(KokoroError::VoiceParse(
                "voice archive contained no .npy entries".to_string(),
            ));
        }

        log::info!("Loaded {} voices from {}", voices.len(), path.display());
        Ok(Self { voices })
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.voices.contains_key(voice)
    }

    /// Style vector for `voice` at `index` (clamped to the available rows).
    pub fn style(&self, voice: &str, index: usize) -> Result<&[f32], KokoroError> {
        self.voices
            .get(voice)
            .map(|table| table.row(index))
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))
    }

    /// All voice names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parse a `.npy` payload into a style table.
///
/// Accepts format versions 1–3 and requires dtype `<f4`, C order, and a 2-D
/// shape whose second dimension is [`STYLE_DIM`].
fn parse_npy(bytes: &[u8]) -> Result<StyleTable, String> {
    if bytes.len() < 10 || &bytes[..6] != b"\x93NUMPY" {
        return Err("missing numpy magic bytes".to_string());
    }

    let (header_len, header_start) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated header length".to_string());
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        other => return Err(format!("unsupported npy version {other}")),
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(format!(
            "header claims {header_len} bytes but payload has {}",
            bytes.len() - header_start
        ));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| "header is not valid UTF-8".to_string())?;

    if !header.contains("'descr': '<f4'") {
        return Err("expected dtype '<f4'".to_string());
    }
    if !header.contains("'fortran_order': False") {
        return Err("expected C-ordered data".to_string());
    }
    let shape = parse_shape(header).ok_or_else(|| "missing shape".to_string())?;
    let (rows, cols) = match shape.as_slice() {
        // Some exports store each row as [1, 256]; treat the singleton
        // dimension as part of the row count.
        &[rows, 1, cols] | &[rows, cols] => (rows, cols),
        other => return Err(format!("expected 2-D shape, got {other:?}")),
    };
    if cols != STYLE_DIM {
        return Err(format!("expected {STYLE_DIM} columns, got {cols}"));
    }
    if rows == 0 {
        return Err("voice has no style rows".to_string());
    }

    let payload = &bytes[data_start..];
    if payload.len() != rows * cols * 4 {
        return Err(format!(
            "expected {} data bytes, got {}",
            rows * cols * 4,
            payload.len()
        ));
    }

    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(StyleTable { rows, data })
}

/// Extract the `'shape': (..)` tuple from an npy header dict.
fn parse_shape(header: &str) -> Option<Vec<usize>> {
    let rest = &header[header.find("'shape':")? + "'shape':".len()..];
    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;

    let mut shape = Vec::new();
    for part in rest[open + 1..close].split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        shape.push(part.parse().ok()?);
    }
    Some(shape)
}
