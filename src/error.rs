//! Error types for the edgequake-thesis library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ThesisError`] — **Fatal**: the current run cannot proceed (bad input
//!   deck, missing credential, model call failed, analysis output could not
//!   be parsed). Returned as `Err(ThesisError)` from the top-level `assess*`
//!   functions and from each pipeline stage that is allowed to fail.
//!
//! * [`SlideError`] — **Non-fatal**: a single slide could not be classified
//!   (transport glitch, answer outside the taxonomy). The slide degrades to
//!   [`crate::taxonomy::Category::Unclassified`] and the batch continues; the
//!   error is only logged and forwarded to progress callbacks.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-thesis library.
///
/// Slide-level classification failures use [`SlideError`] and never surface
/// here.
#[derive(Debug, Error)]
pub enum ThesisError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Deck file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The deck is larger than the accepted upload size.
    #[error("File size {size} bytes exceeds the {limit} byte limit ({limit_mib} MiB)", limit_mib = .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    /// The file exists and was read, but is not a zip-based `.pptx` container.
    #[error("File is not a valid .pptx deck: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPptx { source_name: String, magic: [u8; 4] },

    // ── Deck errors ───────────────────────────────────────────────────────
    /// The container opened but its presentation parts are missing or unreadable.
    #[error("Deck '{source_name}' is corrupt: {detail}")]
    CorruptDeck { source_name: String, detail: String },

    /// Slide count falls outside the accepted range.
    #[error("Invalid slide count: {count}. Must be between {min} and {max}.")]
    SlideCountOutOfRange { count: usize, min: usize, max: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The completion client cannot be constructed (missing API key etc.).
    #[error("LLM client is not configured: {0}")]
    Configuration(String),

    /// Network failure, non-2xx status or timeout. Not retried.
    #[error("LLM API error: {detail}")]
    Transport { detail: String },

    /// A 2xx response that lacks `choices[0].message.content`.
    #[error("Invalid API response: {detail}")]
    ResponseShape { detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Too few distinct taxonomy categories survived classification.
    #[error(
        "Only {} valid categories found: {}\nAt least {required} distinct categories are required.",
        .found.len(),
        .found.join(", ")
    )]
    InsufficientCategories { found: Vec<String>, required: usize },

    /// The cleaned analysis output is not valid structured data.
    ///
    /// `raw` holds the untouched model output for inspection.
    #[error("Invalid JSON in LLM analysis output: {message}")]
    AnalysisParse { message: String, raw: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// pdfium returned an error while building the report.
    #[error("Report rendering failed: {0}")]
    RenderFailed(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
The PDF report is written through PDFium. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the executable or in the working directory.\n\
  • Install a system-wide pdfium (e.g. from bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ThesisError {
    /// The raw model output attached to this error, if any.
    ///
    /// Only [`ThesisError::AnalysisParse`] carries one; callers print it next
    /// to the error so the malformed response can be inspected.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            ThesisError::AnalysisParse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// A non-fatal error for a single slide.
///
/// The slide is downgraded to `Unclassified`; the batch continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SlideError {
    /// The completion call itself failed.
    #[error("Slide {slide}: classification call failed: {detail}")]
    CallFailed { slide: usize, detail: String },

    /// The model answered with something outside the taxonomy.
    #[error("Slide {slide}: invalid category returned: {answer:?}")]
    OutsideTaxonomy { slide: usize, answer: String },
}
