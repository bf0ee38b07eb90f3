//! Strict decoding of the grading model's verdict.
//!
//! Models frequently wrap JSON output in a Markdown code fence even when the
//! prompt forbids it, so the decoder strips incidental fencing before
//! parsing. Anything else that fails to parse is a first-class job failure,
//! not an ambient exception.

use mentora_core::{Error, GradingVerdict, Result};

/// Strip a surrounding Markdown code fence (``` or ```json) if present.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode the model response into a typed verdict.
pub fn parse_verdict(raw: &str) -> Result<GradingVerdict> {
    let cleaned = strip_code_fences(raw);
    let verdict: GradingVerdict = serde_json::from_str(cleaned)
        .map_err(|e| Error::Serialization(format!("Verdict decode failed: {e}")))?;

    if !(0.0..=100.0).contains(&verdict.score) {
        return Err(Error::Serialization(format!(
            "Verdict score {} outside 0-100",
            verdict.score
        )));
    }

    Ok(verdict)
}
