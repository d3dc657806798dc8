use std::io::Write;
use std::process::{Command, Stdio};

use super::vocab::Vocab;
use super::KokoroError;

/// Punctuation that ends a clause and is carried through as its own token.
const CLAUSE_PUNCT: &[char] = &['.', '!', '?', ',', ';', ':'];

/// Resolve the espeak-ng voice for a Kokoro language code.
///
/// `lang` is the single-letter code the Kokoro project uses (`a` American
/// English, `b` British English, ...). An unknown code falls back to the
/// language implied by the voice name prefix (`af_heart` -> `en-us`).
pub fn espeak_voice(lang: &str, voice: &str) -> &'static str {
    match lang {
        "a" => "en-us",
        "b" => "en-gb",
        "e" => "es",
        "f" => "fr",
        "h" => "hi",
        "i" => "it",
        "j" => "ja",
        "p" => "pt-br",
        "z" => "cmn",
        _ => match voice.as_bytes().first() {
            Some(b'b') => "en-gb",
            Some(b'e') => "es",
            Some(b'f') => "fr",
            Some(b'h') => "hi",
            Some(b'i') => "it",
            Some(b'j') => "ja",
            Some(b'p') => "pt-br",
            Some(b'z') => "cmn",
            _ => "en-us",
        },
    }
}

/// One clause of input text plus the punctuation mark that ended it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    text: String,
    punct: Option<char>,
}

/// Split text into clauses at sentence punctuation.
///
/// Whitespace runs collapse to single spaces. A trailing clause without
/// punctuation is kept as-is.
fn split_clauses(text: &str) -> Vec<Clause> {
    let mut clauses = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        if CLAUSE_PUNCT.contains(&ch) && !joins_digits(text, idx, ch) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                clauses.push(Clause {
                    text: trimmed.to_string(),
                    punct: Some(ch),
                });
            } else if let Some(last) = clauses.last_mut() {
                // "wait..." — fold repeated punctuation onto the clause before it.
                last.punct = Some(ch);
            }
            current.clear();
        } else if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
        } else {
            current.push(ch);
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        clauses.push(Clause {
            text: trimmed.to_string(),
            punct: None,
        });
    }
    clauses
}

/// `.` and `,` between two digits are number separators ("3.14", "1,000"),
/// not clause boundaries.
fn joins_digits(text: &str, idx: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }
    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch.len_utf8()..].chars().next();
    matches!(
        (prev, next),
        (Some(p), Some(n)) if p.is_ascii_digit() && n.is_ascii_digit()
    )
}

/// Run espeak-ng over stdin and return its IPA output, one line per input line.
fn run_espeak(input: &str, espeak_voice: &str) -> Result<String, KokoroError> {
    let mut child = Command::new("espeak-ng")
        .args(["-q", "--ipa", "--stdin", "-v", espeak_voice])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KokoroError::EspeakNotFound
            } else {
                KokoroError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
        // Without a final line terminator espeak-ng under-processes the
        // last token.
        if !input.ends_with('\n') {
            stdin.write_all(b"\n")?;
        }
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Map IPA text to token IDs, dropping characters outside the vocabulary.
fn ipa_to_ids(ipa: &str, vocab: &Vocab) -> Vec<i64> {
    let mut ids = Vec::new();
    for line in ipa.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !ids.is_empty() {
            if let Some(space) = vocab.id(' ') {
                ids.push(space);
            }
        }
        ids.extend(line.chars().filter_map(|ch| vocab.id(ch)));
    }
    ids
}

/// Token run for one clause: IPA tokens followed by the punctuation token.
fn clause_ids(ipa: &str, punct: Option<char>, vocab: &Vocab) -> Vec<i64> {
    let mut ids = ipa_to_ids(ipa, vocab);
    if let Some(id) = punct.and_then(|p| vocab.id(p)) {
        ids.push(id);
    }
    ids
}

/// Pack per-clause token runs into chunks of at most `max_tokens` IDs.
///
/// Clause boundaries are preferred split points; a single clause longer than
/// the limit is hard-split.
fn pack_chunks(clause_runs: Vec<Vec<i64>>, max_tokens: usize) -> Vec<Vec<i64>> {
    let mut chunks: Vec<Vec<i64>> = Vec::new();
    let mut current: Vec<i64> = Vec::new();

    for run in clause_runs {
        if run.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + run.len() > max_tokens {
            chunks.push(std::mem::take(&mut current));
        }
        if run.len() > max_tokens {
            for piece in run.chunks(max_tokens) {
                chunks.push(piece.to_vec());
            }
            continue;
        }
        current.extend(run);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Convert `text` into chunks of phoneme token IDs ready for inference.
///
/// Each chunk holds at most `max_tokens` IDs and becomes one audio segment.
pub fn to_token_chunks(
    text: &str,
    espeak_voice: &str,
    vocab: &Vocab,
    max_tokens: usize,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let clauses = split_clauses(text);
    if clauses.is_empty() {
        return Ok(Vec::new());
    }

    // One espeak-ng call for the whole text, one clause per stdin line.
    let batched = clauses
        .iter()
        .map(|clause| clause.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let output = run_espeak(&batched, espeak_voice)?;
    let lines: Vec<&str> = output.lines().collect();

    let runs: Vec<Vec<i64>> = if lines.len() == clauses.len() {
        clauses
            .iter()
            .zip(lines)
            .map(|(clause, ipa)| clause_ids(ipa, clause.punct, vocab))
            .collect()
    } else {
        // espeak-ng normally emits one IPA line per input line; when that
        // assumption breaks, retry one clause per call.
        let mut runs = Vec::with_capacity(clauses.len());
        for clause in &clauses {
            let ipa = run_espeak(&clause.text, espeak_voice)?;
            runs.push(clause_ids(&ipa, clause.punct, vocab));
        }
        runs
    };

    let chunks = pack_chunks(runs, max_tokens);
    if chunks.len() > 1 {
        log::debug!(
            "Phoneme sequence split into {} chunks (limit {max_tokens})",
            chunks.len()
        );
    }
    Ok(chunks)
}
