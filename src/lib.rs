//! # edgequake-thesis
//!
//! Turn a startup pitch deck (`.pptx`) into a structured investment thesis
//! and a PDF report using a chat-completion LLM.
//!
//! ## Why this crate?
//!
//! Reading a pitch deck well means knowing *which* slide talks about the
//! market, the team or the ask before judging any of it. This crate first
//! labels every slide with one of nine pitch-deck categories, then hands the
//! grouped text to the model in a single analysis call that must answer with
//! a fixed JSON schema. Model answers are never trusted blindly: labels are
//! matched exactly, the JSON is repaired and parsed strictly, and the result
//! is checked against the schema it was asked for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .pptx
//!  │
//!  ├─ 1. Input     resolve local file or download from URL (≤ 50 MiB)
//!  ├─ 2. Extract   slide text in presentation order (5–20 slides)
//!  ├─ 3. Classify  one call per slide → Problem, Market, Team, …
//!  ├─ 4. Gate      at least 3 distinct categories
//!  ├─ 5. Analyze   one call over the grouped slides → JSON thesis
//!  ├─ 6. Repair    fences, prefixes, prose → strict parse + validation
//!  └─ 7. Render    A4 PDF report via pdfium
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_thesis::{assess, ThesisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GROQ_API_KEY
//!     let config = ThesisConfig::from_env();
//!     let assessment = assess("pitch.pptx", &config).await?;
//!     println!("{} ({}/100)",
//!         assessment.thesis.recommendation,
//!         assessment.thesis.overall_score);
//!     for w in &assessment.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `thesis` binary (clap + anyhow + tracing-subscriber + indicatif + dotenv) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-thesis = { version = "0.1", default-features = false }
//! ```
//!
//! ## Model Calls
//!
//! A deck of N slides costs N small classification calls (≤ 50 tokens each)
//! plus one analysis call (≤ 3500 tokens). Calls are made one at a time and
//! are never retried.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assess;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;
pub mod taxonomy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assess::{
    assess, assess_from_bytes, assess_sync, assess_to_file, classify_deck, extract, inspect,
    resolve_backend, write_report,
};
pub use config::{ThesisConfig, ThesisConfigBuilder};
pub use error::{SlideError, ThesisError};
pub use output::{
    Assessment, AssessmentStats, CategoryScore, ClassifiedSlide, DeckMetadata, Recommendation,
    RenderedReport, SlideRecord, ThesisResult,
};
pub use pipeline::classify::{categories_found, ensure_sufficient};
pub use pipeline::llm::{CompletionBackend, CompletionClient};
pub use pipeline::postprocess::{parse_json_value, parse_thesis};
pub use pipeline::render::{check_renderer, render_report, report_filename};
pub use progress::{AssessmentProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{classify_stream, classify_stream_from_bytes, SlideStream};
pub use taxonomy::Category;
