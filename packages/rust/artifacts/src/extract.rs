//! Recover an HTML/CSS bundle from free-form model output.
//!
//! The raw text is split on code fences. The first segment tagged `json`
//! that lexically mentions both an `HTML` and a `CSS` key is the candidate;
//! only that candidate is parsed strictly. Prose and other code blocks are
//! never handed to the JSON parser.

use std::sync::LazyLock;

use genscribe_shared::{CodeBundle, GenscribeError, Result};
use regex::Regex;
use tracing::{debug, instrument};

/// Fence marker delimiting code segments in model output.
pub const FENCE: &str = "```";

/// Language tag a candidate segment must start with.
pub const JSON_TAG: &str = "json";

static HTML_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:"HTML"|'HTML')\s*:"#).expect("valid regex"));

static CSS_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:"CSS"|'CSS')\s*:"#).expect("valid regex"));

/// Extract the [`CodeBundle`] carried by `raw`.
///
/// Fails with a content-validation error when no segment qualifies, and with
/// a parse error when the chosen segment is not a well-formed bundle.
#[instrument(skip_all, fields(len = raw.len()))]
pub fn extract_bundle(raw: &str) -> Result<CodeBundle> {
    let (index, segment) = raw
        .split(FENCE)
        .enumerate()
        .find(|(_, segment)| is_candidate(segment))
        .ok_or_else(GenscribeError::content_validation)?;

    debug!(segment = index, "found candidate json segment");

    let payload = &segment[JSON_TAG.len()..];
    serde_json::from_str::<CodeBundle>(payload)
        .map_err(|e| GenscribeError::parse(format!("json segment {index} is not a code bundle: {e}")))
}

/// Lexical pre-check: `json` tag plus both keys, each in either quote style.
fn is_candidate(segment: &str) -> bool {
    segment.starts_with(JSON_TAG) && HTML_KEY_RE.is_match(segment) && CSS_KEY_RE.is_match(segment)
}
