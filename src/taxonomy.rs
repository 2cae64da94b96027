//! The fixed pitch-deck taxonomy and the scoring weights of the thesis.
//!
//! Two related but distinct lists live here:
//!
//! * [`Category`] — the 9 labels a slide can be classified into, plus the
//!   catch-all [`Category::Unclassified`]. Labels are exact, case-sensitive
//!   strings; no synonyms are accepted.
//! * [`SCORING_WEIGHTS`] — the 9 scored dimensions of the thesis. These are
//!   *not* the slide labels: "Funding Ask" is not scored and "Clarity" is
//!   scored although no slide is ever classified as such.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Slide category assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Problem,
    Solution,
    Market,
    #[serde(rename = "Business Model")]
    BusinessModel,
    Competition,
    Team,
    Financials,
    Traction,
    #[serde(rename = "Funding Ask")]
    FundingAsk,
    /// The model's answer did not match the taxonomy, or the call failed.
    Unclassified,
}

impl Category {
    /// The 9 taxonomy labels in their canonical order (no `Unclassified`).
    pub const TAXONOMY: [Category; 9] = [
        Category::Problem,
        Category::Solution,
        Category::Market,
        Category::BusinessModel,
        Category::Competition,
        Category::Team,
        Category::Financials,
        Category::Traction,
        Category::FundingAsk,
    ];

    /// The exact label string.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Problem => "Problem",
            Category::Solution => "Solution",
            Category::Market => "Market",
            Category::BusinessModel => "Business Model",
            Category::Competition => "Competition",
            Category::Team => "Team",
            Category::Financials => "Financials",
            Category::Traction => "Traction",
            Category::FundingAsk => "Funding Ask",
            Category::Unclassified => "Unclassified",
        }
    }

    /// One-line description used in the classification prompt.
    pub fn description(self) -> &'static str {
        match self {
            Category::Problem => "Market problems or pain points",
            Category::Solution => "Product or service solutions",
            Category::Market => "Market size, opportunity, target market",
            Category::BusinessModel => "Revenue model, pricing, strategy",
            Category::Competition => "Competitors or competitive advantage",
            Category::Team => "Team members, experience, expertise",
            Category::Financials => "Financial projections, metrics, funding",
            Category::Traction => "Growth, customers, achievements",
            Category::FundingAsk => "Funding needs, investment terms",
            Category::Unclassified => "Could not be classified",
        }
    }

    /// `true` for the 9 taxonomy labels, `false` for `Unclassified`.
    pub fn is_known(self) -> bool {
        self != Category::Unclassified
    }

    /// Exact-match lookup among the 9 taxonomy labels.
    ///
    /// Returns `None` for anything else, including `"Unclassified"` and
    /// differently-cased spellings.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::TAXONOMY
            .iter()
            .copied()
            .find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Category::Unclassified.as_str() {
            return Ok(Category::Unclassified);
        }
        Category::from_label(s).ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Fixed scoring weights (percent) of the 9 thesis dimensions, in prompt order.
///
/// The weights sum to 100. The model is asked to reproduce them verbatim.
pub const SCORING_WEIGHTS: [(&str, u32); 9] = [
    ("Problem", 10),
    ("Solution", 15),
    ("Market", 20),
    ("Business Model", 15),
    ("Competition", 10),
    ("Team", 15),
    ("Traction", 10),
    ("Financials", 10),
    ("Clarity", 5),
];

/// The expected weight for a scored dimension, by exact name.
pub fn expected_weight(name: &str) -> Option<u32> {
    SCORING_WEIGHTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, w)| *w)
}
