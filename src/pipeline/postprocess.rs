//! Post-processing: deterministic repair of model-generated JSON.
//!
//! Even with two explicit "JSON only" instructions, chat models wrap their
//! answer in artefacts that a strict parser rejects:
//!
//! - ` ```json ... ``` ` or bare ` ``` ` fences
//! - a stray `json` word in front of the object
//! - `---` separators copied from the prompt layout
//! - a sentence of prose before or after the object
//! - Windows line endings, a BOM or zero-width characters
//!
//! [`clean_json_response`] removes them with a fixed sequence of pure
//! `&str → String` passes; [`parse_thesis`] then parses strictly. Nothing
//! here repairs the JSON *syntax* itself: a truncated or malformed object is
//! reported as [`ThesisError::AnalysisParse`] together with the raw text.
//!
//! ## Rule Order
//!
//! Line endings and invisible characters go first so the anchored per-line
//! rules see clean input. The greedy `{ … }` span is taken last, after the
//! fences and prefixes that could contain braces are gone.

use crate::error::ThesisError;
use crate::output::ThesisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Apply all cleanup rules to a raw model answer.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF) and strip invisible Unicode
/// 2. Trim the whole text
/// 3. Strip ` ```json ` fences at line starts and ` ``` ` at line ends
/// 4. Strip bare ` ``` ` fences
/// 5. Strip a leading `json` word on any line
/// 6. Trim every line
/// 7. Strip leading `---` separators on any line
/// 8. Keep only the greedy `{ … }` span, if there is one
pub fn clean_json_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = s.trim();
    let s = strip_json_fences(s);
    let s = strip_bare_fences(&s);
    let s = strip_json_prefix(&s);
    let s = trim_lines(&s);
    let s = strip_separators(&s);
    extract_object_span(&s)
}

/// Clean `raw` and parse it into any deserialisable type.
///
/// Fails with [`ThesisError::AnalysisParse`] carrying the parser message and
/// the untouched input.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, ThesisError> {
    let cleaned = clean_json_response(raw);
    debug!("Cleaned analysis output: {} → {} chars", raw.len(), cleaned.len());
    serde_json::from_str(&cleaned).map_err(|e| ThesisError::AnalysisParse {
        message: e.to_string(),
        raw: raw.to_string(),
    })
}

/// Clean and parse into an untyped JSON value.
pub fn parse_json_value(raw: &str) -> Result<serde_json::Value, ThesisError> {
    parse_json(raw)
}

/// Clean and parse into a [`ThesisResult`].
///
/// Schema conformance beyond the types (list lengths, weights, word counts)
/// is checked separately by [`ThesisResult::validate`].
pub fn parse_thesis(raw: &str) -> Result<ThesisResult, ThesisError> {
    parse_json(raw)
}

// ── Rule 1: Line endings and invisible characters ───────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Rule 3: ```json fences ──────────────────────────────────────────────────

static RE_JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```json\s*|\s*```$").unwrap());

fn strip_json_fences(input: &str) -> String {
    RE_JSON_FENCE.replace_all(input, "").into_owned()
}

// ── Rule 4: Bare fences ─────────────────────────────────────────────────────

static RE_BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```\s*|\s*```$").unwrap());

fn strip_bare_fences(input: &str) -> String {
    RE_BARE_FENCE.replace_all(input, "").into_owned()
}

// ── Rule 5: Leading `json` word ─────────────────────────────────────────────

static RE_JSON_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^json\s*").unwrap());

fn strip_json_prefix(input: &str) -> String {
    RE_JSON_PREFIX.replace_all(input, "").into_owned()
}

// ── Rule 6: Trim every line ─────────────────────────────────────────────────

fn trim_lines(input: &str) -> String {
    input.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

// ── Rule 7: `---` separators ────────────────────────────────────────────────

static RE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^---\s*").unwrap());

fn strip_separators(input: &str) -> String {
    RE_SEPARATOR.replace_all(input, "").into_owned()
}

// ── Rule 8: Greedy object span ──────────────────────────────────────────────

static RE_OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

fn extract_object_span(input: &str) -> String {
    match RE_OBJECT_SPAN.find(input) {
        Some(m) => m.as_str().to_string(),
        None => input.to_string(),
    }
}
