//! Parsing of raw review output into categorized recommendations.
//!
//! Review bodies are free text; structure comes only from the fixed category
//! markers. Everything between one marker (or blank-line item break) and the
//! next belongs to a single recommendation.

use serde::{Deserialize, Serialize};

/// Marker that opens the Required section of a review.
pub const REQUIRED_MARKER: &str = "🔴 REQUIRED";
/// Marker that opens the Important section of a review.
pub const IMPORTANT_MARKER: &str = "🟡 IMPORTANT";
/// Marker that opens the Suggestions section of a review.
/// Matches both "SUGGESTION" and "SUGGESTIONS" by substring.
pub const SUGGESTION_MARKER: &str = "🔵 SUGGESTION";

/// Recommendation category, in decreasing order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Required,
    Important,
    Suggestion,
}

/// The categorized, ordered output of parsing one review body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub required: Vec<String>,
    pub important: Vec<String>,
    pub suggestions: Vec<String>,
}

impl RecommendationSet {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.important.is_empty() && self.suggestions.is_empty()
    }

    pub fn items(&self, category: Category) -> &[String] {
        match category {
            Category::Required => &self.required,
            Category::Important => &self.important,
            Category::Suggestion => &self.suggestions,
        }
    }
}

/// Parse a review body into categorized recommendation lists.
///
/// Scans lines sequentially with a category cursor. A marker line flushes
/// any in-progress item, moves the cursor, and starts a new item; the marker
/// line itself is section-heading chrome and contributes no item text. A
/// blank line ends the in-progress item but keeps the cursor, so the next
/// non-blank line starts a new item in the same category. A body with no
/// markers yields three empty lists.
///
/// Markers are detected by substring match on the trimmed line, so a marker
/// embedded mid-sentence still switches categories. This mirrors how review
/// templates interleave headings and prose.
pub fn parse_review(body: &str) -> RecommendationSet {
    let mut set = RecommendationSet::default();
    let mut cursor: Option<Category> = None;
    let mut current = String::new();

    for line in body.lines() {
        let trimmed = line.trim();

        let marker = if trimmed.contains(REQUIRED_MARKER) {
            Some(Category::Required)
        } else if trimmed.contains(IMPORTANT_MARKER) {
            Some(Category::Important)
        } else if trimmed.contains(SUGGESTION_MARKER) {
            Some(Category::Suggestion)
        } else {
            None
        };

        if let Some(category) = marker {
            flush(&mut set, cursor, &mut current);
            cursor = Some(category);
        } else if cursor.is_some() {
            if trimmed.is_empty() {
                flush(&mut set, cursor, &mut current);
            } else {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(trimmed);
            }
        }
    }

    flush(&mut set, cursor, &mut current);
    set
}

fn flush(set: &mut RecommendationSet, cursor: Option<Category>, current: &mut String) {
    if current.trim().is_empty() {
        current.clear();
        return;
    }
    let item = std::mem::take(current);
    match cursor {
        Some(Category::Required) => set.required.push(item),
        Some(Category::Important) => set.important.push(item),
        Some(Category::Suggestion) => set.suggestions.push(item),
        None => {}
    }
}
