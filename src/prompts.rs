//! Prompts for slide classification and thesis analysis.
//!
//! Every piece of prompt text lives here so the wording can change without
//! touching call or parsing logic, and so tests can inspect prompts directly
//! without a model.

use crate::taxonomy::{Category, SCORING_WEIGHTS};

/// Base system instruction sent with every completion call.
pub const BASE_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that provides concise, accurate responses. ";

/// Appended to [`BASE_SYSTEM_PROMPT`] when the prompt asks for JSON.
pub const JSON_SYSTEM_SUFFIX: &str = "When asked to return JSON, you MUST return ONLY valid, \
properly formatted JSON with no additional text, markdown formatting, or explanations outside \
the JSON object.";

/// Second formatting reminder appended verbatim after the analysis prompt body.
pub const JSON_REMINDER: &str = "\n\nIMPORTANT: Your response MUST be a valid JSON object. \
Do not include any text, markdown formatting, or code blocks outside the JSON object. \
Ensure all string values use double quotes and are properly escaped.";

/// Whether a prompt asks for JSON output.
///
/// A text heuristic, not a content-type flag: the literal `JSON` plus both
/// brace characters.
pub fn wants_json(prompt: &str) -> bool {
    prompt.contains("JSON") && prompt.contains('{') && prompt.contains('}')
}

/// The system instruction for a given user prompt.
pub fn system_prompt_for(prompt: &str) -> String {
    if wants_json(prompt) {
        format!("{BASE_SYSTEM_PROMPT}{JSON_SYSTEM_SUFFIX}")
    } else {
        BASE_SYSTEM_PROMPT.to_string()
    }
}

/// Build the single-slide classification prompt.
///
/// Lists the 9 taxonomy labels with one-line descriptions and asks for the
/// bare category name only.
pub fn classification_prompt(slide_text: &str) -> String {
    let mut prompt = String::from(
        "Task: Classify the following startup pitch deck slide into exactly one category.\n\n\
         Categories:\n",
    );
    for (i, cat) in Category::TAXONOMY.iter().enumerate() {
        prompt.push_str(&format!("{}. {} - {}\n", i + 1, cat, cat.description()));
    }
    prompt.push_str(&format!("\nSlide Content:\n{slide_text}\n\n"));
    prompt.push_str(
        "Instructions:\n\
         1. Choose the single most appropriate category\n\
         2. Return ONLY the category name\n\
         3. Do not include any explanations or additional text\n\
         4. Use exact category names as listed above",
    );
    prompt
}

/// Header of the analysis prompt: output schema, fixed weights and strict
/// JSON rules.
///
/// `processing_date` is the timestamp the model must echo back, already in
/// `DD-MM-YYYY HH:MM:SS UTC` form.
pub fn analysis_header(processing_date: &str) -> String {
    let weights = SCORING_WEIGHTS
        .iter()
        .map(|(name, w)| format!("{name} {w}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are an AI investment analyst. Based on the following pitch deck content, produce an \
investment thesis. IMPORTANT: Return your response as a VALID JSON object with the following fields:\n\n\
- recommendation: one of [\"Strong Buy\", \"Hold\", \"Pass\"]\n\
- overall_score: integer 0–100\n\
- processing_date: \"{processing_date}\" (current UTC in format DD-MM-YYYY HH:MM:SS UTC)\n\
- confidence_score: integer 0–100\n\
- strengths: list of 3–5 strings\n\
- weaknesses: list of 3–5 strings\n\
- recommendations: string (100–200 words)\n\
- categories: list of 9 objects, each with:\n  - name (category name),\n  - score (0–10),\n  \
- weight (int %),\n  - feedback (50–150 words)\n\n\
Shape: {{\"recommendation\": \"Hold\", \"overall_score\": 0, \"processing_date\": \"\", \
\"confidence_score\": 0, \"strengths\": [], \"weaknesses\": [], \"recommendations\": \"\", \
\"categories\": [{{\"name\": \"\", \"score\": 0, \"weight\": 0, \"feedback\": \"\"}}]}}\n\n\
Use these fixed weights: {weights}\n\n\
STRICT JSON FORMATTING RULES:\n\
1. Return ONLY a valid JSON object, nothing else\n\
2. Use double quotes for all keys and string values\n\
3. Do not include any explanatory text before or after the JSON\n\
4. Do not use markdown code blocks or formatting\n\
5. Ensure all strings are properly escaped\n\n\
Classified Slides:\n"
    )
}

/// Per-category section of the analysis prompt body.
pub fn category_section(category: Category, texts: &[&str]) -> String {
    format!("\n---\nCategory: {}\n{}\n", category, texts.join("\n"))
}
