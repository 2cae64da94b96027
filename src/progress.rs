//! Progress-callback trait for per-slide assessment events.
//!
//! Inject an [`Arc<dyn AssessmentProgressCallback>`] via
//! [`crate::config::ThesisConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts, classifies and analyses a deck.
//!
//! # Example
//!
//! ```rust
//! use edgequake_thesis::{AssessmentProgressCallback, Category, ThesisConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     classified: Arc<AtomicUsize>,
//! }
//!
//! impl AssessmentProgressCallback for CountingCallback {
//!     fn on_slide_classified(&self, slide: usize, total: usize, category: Category) {
//!         self.classified.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Slide {}/{} → {}", slide, total, category);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     classified: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ThesisConfig::builder()
//!     .progress_callback(counter as Arc<dyn AssessmentProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::taxonomy::Category;
use std::sync::Arc;

/// Called by the assessment pipeline as it works through a deck.
///
/// Slides are classified strictly one after another, so events for one run
/// never overlap. Implementations are still `Send + Sync` so one callback can
/// be shared between runs. All methods default to no-ops.
pub trait AssessmentProgressCallback: Send + Sync {
    /// Called once the deck is read, before any model call.
    ///
    /// # Arguments
    /// * `total_slides` — number of slides that will be classified
    fn on_extraction_complete(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called just before the classification request for a slide is sent.
    fn on_slide_start(&self, slide: usize, total_slides: usize) {
        let _ = (slide, total_slides);
    }

    /// Called when a slide received a taxonomy label.
    fn on_slide_classified(&self, slide: usize, total_slides: usize, category: Category) {
        let _ = (slide, total_slides, category);
    }

    /// Called when a slide degraded to `Unclassified`.
    ///
    /// # Arguments
    /// * `reason` — human-readable cause (call failure or off-taxonomy answer)
    fn on_slide_unclassified(&self, slide: usize, total_slides: usize, reason: &str) {
        let _ = (slide, total_slides, reason);
    }

    /// Called before the single analysis request is sent.
    ///
    /// # Arguments
    /// * `categories_found` — distinct known categories that passed the gate
    fn on_analysis_start(&self, categories_found: &[Category]) {
        let _ = categories_found;
    }

    /// Called after the analysis output was parsed into a thesis.
    ///
    /// # Arguments
    /// * `warnings` — number of advisory validation findings
    fn on_analysis_complete(&self, warnings: usize) {
        let _ = warnings;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssessmentProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ThesisConfig`].
pub type ProgressCallback = Arc<dyn AssessmentProgressCallback>;
