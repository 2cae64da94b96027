//! Per-slide classification into the fixed taxonomy.
//!
//! One completion call per slide, strictly in slide order. A slide whose call
//! fails or whose answer is not a taxonomy label becomes
//! [`Category::Unclassified`]; classification never fails the batch. The only
//! hard gate is [`ensure_sufficient`], applied by the caller before analysis.

use crate::error::{SlideError, ThesisError};
use crate::output::{ClassifiedSlide, SlideRecord};
use crate::pipeline::llm::CompletionBackend;
use crate::progress::AssessmentProgressCallback;
use crate::prompts::classification_prompt;
use crate::taxonomy::Category;
use tracing::{debug, info, warn};

/// Map a raw model answer to a taxonomy label.
///
/// Takes the first whitespace-delimited token, capitalises it (first letter
/// upper, rest lower) and accepts an exact match. Two-word labels are tried
/// the same way on the first two tokens, so `"business model"` and
/// `"FUNDING ASK"` are recognised.
pub fn normalize_label(answer: &str) -> Option<Category> {
    let mut tokens = answer.split_whitespace().map(capitalize);
    let first = tokens.next()?;
    if let Some(cat) = Category::from_label(&first) {
        return Some(cat);
    }
    let second = tokens.next()?;
    Category::from_label(&format!("{first} {second}"))
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Classify one slide, reporting why it degraded when it did.
pub async fn classify_slide(
    backend: &dyn CompletionBackend,
    slide: usize,
    text: &str,
    max_tokens: u32,
) -> Result<Category, SlideError> {
    let prompt = classification_prompt(text);
    let answer = backend
        .complete(&prompt, max_tokens)
        .await
        .map_err(|e| SlideError::CallFailed {
            slide,
            detail: e.to_string(),
        })?;
    normalize_label(&answer).ok_or(SlideError::OutsideTaxonomy { slide, answer })
}

/// Classify slide text; never fails.
pub async fn classify(backend: &dyn CompletionBackend, text: &str, max_tokens: u32) -> Category {
    match classify_slide(backend, 0, text, max_tokens).await {
        Ok(cat) => cat,
        Err(e) => {
            warn!("Invalid category returned: {}", e);
            Category::Unclassified
        }
    }
}

/// Classify every slide in order, one call at a time.
pub async fn classify_all(
    backend: &dyn CompletionBackend,
    slides: Vec<SlideRecord>,
    max_tokens: u32,
    progress: &dyn AssessmentProgressCallback,
) -> Vec<ClassifiedSlide> {
    let total = slides.len();
    let mut out = Vec::with_capacity(total);

    for slide in slides {
        let index = slide.index;
        progress.on_slide_start(index, total);

        let category = match classify_slide(backend, index, &slide.raw_text, max_tokens).await {
            Ok(cat) => {
                debug!("Slide {}/{}: {}", index, total, cat);
                progress.on_slide_classified(index, total, cat);
                cat
            }
            Err(e) => {
                warn!("{}", e);
                progress.on_slide_unclassified(index, total, &e.to_string());
                Category::Unclassified
            }
        };
        out.push(ClassifiedSlide::new(slide, category));
    }

    let known = out.iter().filter(|s| s.category.is_known()).count();
    info!("Classified {}/{} slides", known, total);
    out
}

/// Distinct known categories present, in taxonomy order.
pub fn categories_found(slides: &[ClassifiedSlide]) -> Vec<Category> {
    Category::TAXONOMY
        .iter()
        .copied()
        .filter(|cat| slides.iter().any(|s| s.category == *cat))
        .collect()
}

/// Gate the analysis step on category coverage.
pub fn ensure_sufficient(
    slides: &[ClassifiedSlide],
    min_categories: usize,
) -> Result<Vec<Category>, ThesisError> {
    let found = categories_found(slides);
    if found.len() < min_categories {
        return Err(ThesisError::InsufficientCategories {
            found: found.iter().map(|c| c.to_string()).collect(),
            required: min_categories,
        });
    }
    Ok(found)
}
