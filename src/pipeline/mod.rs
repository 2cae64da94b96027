//! Pipeline stages for pitch-deck assessment.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets the
//! model-facing stages run against a scripted backend.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ classify ──▶ analyze ──▶ postprocess ──▶ render
//! (URL/path) (zip+XML)  (1 call/slide) (1 call)   (JSON repair)   (pdfium)
//! ```
//!
//! 1. [`input`]    — load the user-supplied path or URL; size and zip checks
//! 2. [`extract`]  — slide text in presentation order
//! 3. [`classify`] — one label per slide, degrading to `Unclassified`
//! 4. [`analyze`]  — one analysis prompt over the classified slides
//! 5. [`postprocess`] — deterministic cleanup before strict JSON parsing
//! 6. [`render`]   — A4 report; runs in `spawn_blocking` because pdfium is
//!    not async-safe
//!
//! [`llm`] is the only module with model I/O; stages 3 and 4 reach it through
//! [`llm::CompletionBackend`].

pub mod analyze;
pub mod classify;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
