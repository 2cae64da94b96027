//! Thesis analysis: one prompt over all classified slides, one model call.
//!
//! The prompt is assembled from three parts: the schema/rules header from
//! [`crate::prompts::analysis_header`], one section per known category in
//! first-seen order, and the formatting reminder. The raw answer is returned
//! untouched; parsing happens in [`crate::pipeline::postprocess`].

use crate::error::ThesisError;
use crate::output::ClassifiedSlide;
use crate::pipeline::llm::CompletionBackend;
use crate::prompts::{analysis_header, category_section, JSON_REMINDER};
use crate::taxonomy::Category;
use tracing::{debug, info, warn};

/// Format of the timestamp the model echoes back as `processing_date`.
pub const PROCESSING_DATE_FORMAT: &str = "%d-%m-%Y %H:%M:%S UTC";

/// Current UTC time in [`PROCESSING_DATE_FORMAT`].
pub fn processing_date_now() -> String {
    chrono::Utc::now().format(PROCESSING_DATE_FORMAT).to_string()
}

/// Group slide texts by known category, categories in first-seen order.
///
/// `Unclassified` slides are dropped. Within a category, texts keep slide
/// order.
pub fn group_by_category(slides: &[ClassifiedSlide]) -> Vec<(Category, Vec<&str>)> {
    let mut groups: Vec<(Category, Vec<&str>)> = Vec::new();
    for slide in slides.iter().filter(|s| s.category.is_known()) {
        match groups.iter_mut().find(|(cat, _)| *cat == slide.category) {
            Some((_, texts)) => texts.push(slide.raw_text.as_str()),
            None => groups.push((slide.category, vec![slide.raw_text.as_str()])),
        }
    }
    groups
}

/// Build the analysis prompt body (header plus category sections).
///
/// The trailing formatting reminder is appended by [`analyze`].
pub fn build_analysis_prompt(slides: &[ClassifiedSlide], processing_date: &str) -> String {
    let mut prompt = analysis_header(processing_date);
    for (category, texts) in group_by_category(slides) {
        prompt.push_str(&category_section(category, &texts));
    }
    prompt
}

/// Run the analysis call and return the raw model text.
///
/// A response without any `{` is logged but still returned; the parser
/// reports the actual failure.
pub async fn analyze(
    backend: &dyn CompletionBackend,
    slides: &[ClassifiedSlide],
    processing_date: &str,
    max_tokens: u32,
) -> Result<String, ThesisError> {
    let mut prompt = build_analysis_prompt(slides, processing_date);
    prompt.push_str(JSON_REMINDER);
    debug!("Analysis prompt: {} chars", prompt.len());

    let raw = backend.complete(&prompt, max_tokens).await?;
    if !raw.contains('{') {
        warn!("Analysis response contains no JSON object; parsing will likely fail");
    }
    info!("Analysis response: {} chars", raw.len());
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::test_support::ScriptedBackend;

    fn slide(index: usize, category: Category, text: &str) -> ClassifiedSlide {
        ClassifiedSlide {
            index,
            raw_text: text.to_string(),
            category,
        }
    }

    fn count_headers(prompt: &str) -> usize {
        prompt.matches("\n---\nCategory: ").count()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let slides = vec![
            slide(1, Category::Team, "Alice"),
            slide(2, Category::Problem, "Slow payments"),
            slide(3, Category::Unclassified, "Thank you"),
            slide(4, Category::Team, "Bob"),
        ];
        let groups = group_by_category(&slides);
        assert_eq!(
            groups,
            vec![
                (Category::Team, vec!["Alice", "Bob"]),
                (Category::Problem, vec!["Slow payments"]),
            ]
        );
    }

    #[test]
    fn nine_categories_give_nine_headers_in_first_seen_order() {
        let order = [
            Category::FundingAsk,
            Category::Team,
            Category::Problem,
            Category::Traction,
            Category::Market,
            Category::Financials,
            Category::Solution,
            Category::Competition,
            Category::BusinessModel,
        ];
        let mut slides: Vec<ClassifiedSlide> = order
            .iter()
            .enumerate()
            .map(|(i, c)| slide(i + 1, *c, &format!("text {i}")))
            .collect();
        slides.push(slide(10, Category::Unclassified, "SECRET-UNCLASSIFIED"));
        slides.push(slide(11, Category::Team, "more team"));

        let prompt = build_analysis_prompt(&slides, "16-10-2026 09:30:00 UTC");
        assert_eq!(count_headers(&prompt), 9);
        assert!(!prompt.contains("SECRET-UNCLASSIFIED"));
        assert!(!prompt.contains("Category: Unclassified"));

        let positions: Vec<usize> = order
            .iter()
            .map(|c| prompt.find(&format!("Category: {c}\n")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn seven_slides_four_classified_sends_only_those_four() {
        let slides = vec![
            slide(1, Category::Problem, "TEXT-problem"),
            slide(2, Category::Unclassified, "TEXT-cover"),
            slide(3, Category::Solution, "TEXT-solution"),
            slide(4, Category::Unclassified, "TEXT-agenda"),
            slide(5, Category::Market, "TEXT-market"),
            slide(6, Category::Team, "TEXT-team"),
            slide(7, Category::Unclassified, "TEXT-thanks"),
        ];
        let backend = ScriptedBackend::new([Ok::<_, &str>("{\"ok\": true}")]);
        let raw = analyze(&backend, &slides, "16-10-2026 09:30:00 UTC", 3500)
            .await
            .unwrap();
        assert_eq!(raw, "{\"ok\": true}");

        let prompt = backend.prompt(0);
        for t in ["TEXT-problem", "TEXT-solution", "TEXT-market", "TEXT-team"] {
            assert!(prompt.contains(t), "missing {t}");
        }
        for t in ["TEXT-cover", "TEXT-agenda", "TEXT-thanks"] {
            assert!(!prompt.contains(t), "leaked {t}");
        }
        assert_eq!(count_headers(&prompt), 4);
        assert!(prompt.ends_with(JSON_REMINDER));
        assert_eq!(backend.prompts.lock().unwrap()[0].1, 3500);
    }

    #[tokio::test]
    async fn answer_without_brace_is_still_returned() {
        let slides = vec![slide(1, Category::Team, "Alice")];
        let backend = ScriptedBackend::new([Ok::<_, &str>("I cannot produce that.")]);
        let raw = analyze(&backend, &slides, "d", 3500).await.unwrap();
        assert_eq!(raw, "I cannot produce that.");
    }

    #[tokio::test]
    async fn transport_failure_is_fatal() {
        let slides = vec![slide(1, Category::Team, "Alice")];
        let backend = ScriptedBackend::new([Err::<&str, _>("HTTP 500")]);
        let err = analyze(&backend, &slides, "d", 3500).await.unwrap_err();
        assert!(matches!(err, ThesisError::Transport { .. }));
    }

    #[test]
    fn processing_date_has_expected_shape() {
        let d = processing_date_now();
        assert!(d.ends_with(" UTC"));
        assert!(chrono::NaiveDateTime::parse_from_str(
            d.trim_end_matches(" UTC"),
            "%d-%m-%Y %H:%M:%S"
        )
        .is_ok());
    }
}
