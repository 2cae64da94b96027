//! Data types flowing through and out of the assessment pipeline.
//!
//! Leaf-first: [`SlideRecord`] (extractor) → [`ClassifiedSlide`] (classifier)
//! → [`ThesisResult`] (analyzer) → [`RenderedReport`] (renderer). The
//! [`Assessment`] bundles everything a caller may want to inspect after a run.

use crate::taxonomy::{expected_weight, Category, SCORING_WEIGHTS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text of one slide, as extracted from the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based slide position in presentation order.
    pub index: usize,
    /// Visible text of every text-bearing shape, joined by single spaces.
    pub raw_text: String,
}

/// A slide together with the label the classifier assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSlide {
    pub index: usize,
    pub raw_text: String,
    pub category: Category,
}

impl ClassifiedSlide {
    pub fn new(slide: SlideRecord, category: Category) -> Self {
        Self {
            index: slide.index,
            raw_text: slide.raw_text,
            category,
        }
    }
}

/// Investment recommendation of the thesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Hold,
    Pass,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Pass => "Pass",
        })
    }
}

/// Score of one thesis dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    /// 0–10.
    pub score: u32,
    /// Percent; see [`crate::taxonomy::SCORING_WEIGHTS`].
    pub weight: u32,
    /// Target 50–150 words.
    pub feedback: String,
}

/// The structured investment thesis produced by the analysis call.
///
/// Field names match the JSON keys the model is asked to emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThesisResult {
    pub recommendation: Recommendation,
    /// 0–100.
    pub overall_score: u32,
    /// `DD-MM-YYYY HH:MM:SS UTC`.
    pub processing_date: String,
    /// 0–100.
    pub confidence_score: u32,
    /// 3–5 entries.
    pub strengths: Vec<String>,
    /// 3–5 entries.
    pub weaknesses: Vec<String>,
    /// Target 100–200 words.
    pub recommendations: String,
    /// Exactly 9 entries, one per scored dimension.
    pub categories: Vec<CategoryScore>,
}

impl ThesisResult {
    /// Check the thesis against the shape the model was asked to produce.
    ///
    /// Every finding is advisory: the model is trusted, and a thesis with
    /// warnings still renders. Returns an empty list for a conforming thesis.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.overall_score > 100 {
            warnings.push(format!("overall_score {} is above 100", self.overall_score));
        }
        if self.confidence_score > 100 {
            warnings.push(format!(
                "confidence_score {} is above 100",
                self.confidence_score
            ));
        }
        if !(3..=5).contains(&self.strengths.len()) {
            warnings.push(format!(
                "expected 3–5 strengths, got {}",
                self.strengths.len()
            ));
        }
        if !(3..=5).contains(&self.weaknesses.len()) {
            warnings.push(format!(
                "expected 3–5 weaknesses, got {}",
                self.weaknesses.len()
            ));
        }
        let rec_words = word_count(&self.recommendations);
        if !(100..=200).contains(&rec_words) {
            warnings.push(format!(
                "recommendations has {rec_words} words (target 100–200)"
            ));
        }

        if self.categories.len() != SCORING_WEIGHTS.len() {
            warnings.push(format!(
                "expected {} categories, got {}",
                SCORING_WEIGHTS.len(),
                self.categories.len()
            ));
        }
        let weight_sum: u32 = self.categories.iter().map(|c| c.weight).sum();
        if weight_sum != 100 {
            warnings.push(format!("category weights sum to {weight_sum}, not 100"));
        }
        for cat in &self.categories {
            if cat.score > 10 {
                warnings.push(format!("{}: score {} is above 10", cat.name, cat.score));
            }
            match expected_weight(&cat.name) {
                Some(w) if w != cat.weight => warnings.push(format!(
                    "{}: weight {} differs from the fixed weight {}",
                    cat.name, cat.weight, w
                )),
                Some(_) => {}
                None => warnings.push(format!("unexpected category '{}'", cat.name)),
            }
            let words = word_count(&cat.feedback);
            if !(50..=150).contains(&words) {
                warnings.push(format!(
                    "{}: feedback has {words} words (target 50–150)",
                    cat.name
                ));
            }
        }

        warnings
    }
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Deck facts available without any model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckMetadata {
    /// The path or URL the deck was read from.
    pub source: String,
    pub file_size: u64,
    pub slide_count: usize,
}

/// Timing and counts for one assessment run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentStats {
    pub total_slides: usize,
    pub classified_slides: usize,
    pub unclassified_slides: usize,
    pub extract_duration_ms: u64,
    pub classify_duration_ms: u64,
    pub analyze_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced by a successful [`crate::assess`] run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub metadata: DeckMetadata,
    pub slides: Vec<ClassifiedSlide>,
    /// Distinct known categories, in taxonomy order.
    pub categories_found: Vec<Category>,
    /// The untouched analysis response, kept for inspection.
    pub raw_analysis: String,
    pub thesis: ThesisResult,
    /// Advisory findings from [`ThesisResult::validate`].
    pub warnings: Vec<String>,
    pub stats: AssessmentStats,
}

/// A rendered report and its deterministic download name.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub filename: String,
}
