//! JSON recovery from model responses
//!
//! The provider is asked for raw JSON but often wraps it in markdown fences
//! or surrounds it with prose. Recovery is layered: a fence labeled `json`,
//! then any fence, then the outermost brace span. Best-effort by design; the
//! upstream output is not grammatically guaranteed.

use serde_json::Value;

use crate::error::{Error, Result};

const FENCE: &str = "```";

/// Locate the JSON payload inside free-form model text. Returns the trimmed
/// candidate, or `None` when nothing JSON-like is present.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(inner) = fenced_block(text, true) {
        return Some(inner);
    }
    if let Some(inner) = fenced_block(text, false) {
        return Some(inner);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(text[start..=end].trim())
    } else {
        None
    }
}

/// Find the first complete fenced block, optionally requiring a `json`
/// language tag (matched case-insensitively).
fn fenced_block(text: &str, require_json_tag: bool) -> Option<&str> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(FENCE) {
        let open = from + rel;
        let header = &text[open + FENCE.len()..];
        // The info string runs to end of line; content starts after it.
        let newline = header.find('\n')?;
        let tag = header[..newline].trim();

        let body_start = open + FENCE.len() + newline + 1;
        let body = &text[body_start..];
        let close = body.find(FENCE)?;

        if !require_json_tag || tag.eq_ignore_ascii_case("json") {
            return Some(body[..close].trim());
        }
        from = body_start + close + FENCE.len();
    }
    None
}

/// Extract and parse the JSON payload of a model response.
///
/// The two failure modes stay distinct: `ModelFormat` when no candidate was
/// found at all, `ModelJson` when a candidate was found but does not parse.
/// Both carry the full raw text for caller-side diagnostics.
pub fn parse_model_json(text: &str) -> Result<Value> {
    let candidate = extract_json(text).ok_or_else(|| Error::ModelFormat {
        raw: text.to_string(),
    })?;

    serde_json::from_str(candidate).map_err(|e| Error::ModelJson {
        reason: e.to_string(),
        raw: text.to_string(),
    })
}
