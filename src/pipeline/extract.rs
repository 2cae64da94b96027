//! Slide text extraction from a `.pptx` container.
//!
//! A `.pptx` is a zip of XML parts. Presentation order is not the file
//! numbering of `ppt/slides/slideN.xml`; it is the `<p:sldIdLst>` of
//! `ppt/presentation.xml`, whose `r:id`s resolve to slide parts through
//! `ppt/_rels/presentation.xml.rels`.
//!
//! Within a slide, every shape with a text body (`<p:sp>` + `<p:txBody>`)
//! contributes its text in document order: runs are concatenated, paragraphs
//! joined by `\n`, the result trimmed. Non-empty shape texts are joined by a
//! single space. A slide without text yields `""`, never an error.
//!
//! The parts are scanned with anchored regexes rather than a full XML parser:
//! only a handful of DrawingML elements matter and they never nest into each
//! other.

use crate::error::ThesisError;
use crate::output::SlideRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{debug, info};
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

static RE_SLIDE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<p:sldId\b[^>]*?\br:id="([^"]+)""#).unwrap());
static RE_RELATIONSHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Relationship\b[^>]*>").unwrap());
static RE_ATTR_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bId="([^"]+)""#).unwrap());
static RE_ATTR_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bTarget="([^"]+)""#).unwrap());
/// Markup-compatibility fallbacks repeat the shapes of their `mc:Choice`.
static RE_MC_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<mc:Fallback\b[^>]*?/>|<mc:Fallback\b[^>]*>.*?</mc:Fallback>").unwrap()
});
static RE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p:sp\b.*?</p:sp>").unwrap());
static RE_TX_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p:txBody\b.*?</p:txBody>").unwrap());
static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:p\b[^>]*?/>|<a:p\b[^>]*>.*?</a:p>").unwrap());
static RE_TEXT_OR_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>|<a:br\b[^>]*>").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// Extract one [`SlideRecord`] per slide, in presentation order.
///
/// Indices are 1-based and contiguous. The slide-count range is *not*
/// enforced here; callers check `records.len()` against their limits.
pub fn extract_slides(deck: &[u8], source: &str) -> Result<Vec<SlideRecord>, ThesisError> {
    let mut archive = open_archive(deck, source)?;
    let parts = slide_parts(&mut archive, source)?;

    let mut records = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let xml = read_part(&mut archive, part, source)?;
        let raw_text = slide_text(&xml);
        debug!("Slide {} ({}): {} chars", i + 1, part, raw_text.len());
        records.push(SlideRecord {
            index: i + 1,
            raw_text,
        });
    }

    info!("Extracted text from {} slides", records.len());
    Ok(records)
}

/// Count slides without reading their content.
pub fn count_slides(deck: &[u8], source: &str) -> Result<usize, ThesisError> {
    let mut archive = open_archive(deck, source)?;
    Ok(slide_parts(&mut archive, source)?.len())
}

/// Visible text of one slide part.
pub fn slide_text(slide_xml: &str) -> String {
    let slide_xml = RE_MC_FALLBACK.replace_all(slide_xml, "");
    RE_SHAPE
        .find_iter(&slide_xml)
        .filter_map(|shape| shape_text(shape.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of one `<p:sp>`; `None` when it has no text body or only whitespace.
fn shape_text(shape_xml: &str) -> Option<String> {
    let body = RE_TX_BODY.find(shape_xml)?;
    let paragraphs: Vec<String> = RE_PARAGRAPH
        .find_iter(body.as_str())
        .map(|p| paragraph_text(p.as_str()))
        .collect();
    let text = paragraphs.join("\n");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn paragraph_text(paragraph_xml: &str) -> String {
    let mut out = String::new();
    for caps in RE_TEXT_OR_BREAK.captures_iter(paragraph_xml) {
        match caps.get(1) {
            Some(run) => out.push_str(&decode_xml_entities(run.as_str())),
            None => out.push('\n'),
        }
    }
    out
}

/// Decode the five predefined XML entities and numeric character references.
///
/// Unknown or out-of-range references are left as written.
pub fn decode_xml_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    RE_ENTITY
        .replace_all(s, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ if name.starts_with("#x") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ => name[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

// ── Container helpers ────────────────────────────────────────────────────

fn open_archive<'a>(
    deck: &'a [u8],
    source: &str,
) -> Result<ZipArchive<Cursor<&'a [u8]>>, ThesisError> {
    ZipArchive::new(Cursor::new(deck)).map_err(|e| ThesisError::CorruptDeck {
        source_name: source.to_string(),
        detail: format!("not a readable zip container: {e}"),
    })
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    source: &str,
) -> Result<String, ThesisError> {
    let mut entry = archive.by_name(name).map_err(|e| ThesisError::CorruptDeck {
        source_name: source.to_string(),
        detail: format!("missing part '{name}': {e}"),
    })?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ThesisError::CorruptDeck {
            source_name: source.to_string(),
            detail: format!("unreadable part '{name}': {e}"),
        })?;
    Ok(xml)
}

/// Slide part names in presentation order.
fn slide_parts(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    source: &str,
) -> Result<Vec<String>, ThesisError> {
    let presentation = read_part(archive, PRESENTATION_PART, source)?;
    let rels_xml = read_part(archive, PRESENTATION_RELS, source)?;
    let rels = relationship_targets(&rels_xml);

    RE_SLIDE_ID
        .captures_iter(&presentation)
        .map(|caps| {
            let rid = &caps[1];
            rels.get(rid)
                .map(|target| resolve_target(target))
                .ok_or_else(|| ThesisError::CorruptDeck {
                    source_name: source.to_string(),
                    detail: format!("slide relationship '{rid}' has no target"),
                })
        })
        .collect()
}

/// `Id → Target` for every relationship in a `.rels` part.
fn relationship_targets(rels_xml: &str) -> HashMap<String, String> {
    RE_RELATIONSHIP
        .find_iter(rels_xml)
        .filter_map(|m| {
            let tag = m.as_str();
            let id = RE_ATTR_ID.captures(tag)?.get(1)?.as_str().to_string();
            let target = RE_ATTR_TARGET.captures(tag)?.get(1)?.as_str().to_string();
            Some((id, target))
        })
        .collect()
}

/// Resolve a relationship target relative to `ppt/` into an archive path.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = vec!["ppt"];
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
