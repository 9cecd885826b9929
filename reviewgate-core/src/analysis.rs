//! Diffing recommendations across review rounds.
//!
//! Comparison is by identity hash, so re-worded badges, renumbering, and
//! `Applied:` annotations do not affect the outcome. Only Required and
//! Important items are tracked; suggestions are informational and never
//! block anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::identity::recommendation_hash;
use crate::recommendation::RecommendationSet;

/// A recommendation with its identity hash and, for resolved items, the
/// time resolution was first observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub hash: String,
    pub text: String,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Per-category item lists for one kind of change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChanges {
    pub required: Vec<TrackedItem>,
    pub important: Vec<TrackedItem>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.important.is_empty()
    }

    pub fn len(&self) -> usize {
        self.required.len() + self.important.len()
    }
}

/// The three-way partition of items between two consecutive reviews.
///
/// `resolved` holds items present previously but absent now; `new` holds
/// items present now but not previously; `persistent` holds items present
/// in both. Input order is preserved within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub resolved: CategoryChanges,
    pub new: CategoryChanges,
    pub persistent: CategoryChanges,
}

/// Diff the current recommendations against the previous review's.
///
/// With no previous review every current item is `new`. `now` stamps the
/// `resolved_at` of every item that disappeared this round.
pub fn analyze_changes(
    current: &RecommendationSet,
    previous: Option<&RecommendationSet>,
    now: DateTime<Utc>,
) -> ChangeAnalysis {
    let empty = RecommendationSet::default();
    let previous = previous.unwrap_or(&empty);

    let mut analysis = ChangeAnalysis::default();
    diff_category(
        &current.required,
        &previous.required,
        now,
        &mut analysis.resolved.required,
        &mut analysis.new.required,
        &mut analysis.persistent.required,
    );
    diff_category(
        &current.important,
        &previous.important,
        now,
        &mut analysis.resolved.important,
        &mut analysis.new.important,
        &mut analysis.persistent.important,
    );
    analysis
}

fn diff_category(
    current: &[String],
    previous: &[String],
    now: DateTime<Utc>,
    resolved: &mut Vec<TrackedItem>,
    new: &mut Vec<TrackedItem>,
    persistent: &mut Vec<TrackedItem>,
) {
    let previous_hashes: HashSet<String> =
        previous.iter().map(|t| recommendation_hash(t)).collect();
    let current_hashes: HashSet<String> =
        current.iter().map(|t| recommendation_hash(t)).collect();

    for text in previous {
        let hash = recommendation_hash(text);
        if !current_hashes.contains(&hash) {
            resolved.push(TrackedItem {
                hash,
                text: text.clone(),
                resolved_at: Some(now),
            });
        }
    }

    for text in current {
        let hash = recommendation_hash(text);
        let item = TrackedItem {
            hash: hash.clone(),
            text: text.clone(),
            resolved_at: None,
        };
        if previous_hashes.contains(&hash) {
            persistent.push(item);
        } else {
            new.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(required: &[&str], important: &[&str]) -> RecommendationSet {
        RecommendationSet {
            required: required.iter().map(|s| s.to_string()).collect(),
            important: important.iter().map(|s| s.to_string()).collect(),
            suggestions: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        "2024-12-13T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_first_review_everything_is_new() {
        let current = set(&["Fix injection", "Fix auth"], &["Add logging"]);
        let analysis = analyze_changes(&current, None, now());

        assert_eq!(analysis.new.required.len(), 2);
        assert_eq!(analysis.new.important.len(), 1);
        assert!(analysis.resolved.is_empty());
        assert!(analysis.persistent.is_empty());
        assert!(analysis.new.required.iter().all(|i| i.resolved_at.is_none()));
    }

    #[test]
    fn test_disappeared_item_is_resolved_with_timestamp() {
        let previous = set(&["Fix injection", "Fix auth"], &[]);
        let current = set(&["Fix auth"], &[]);
        let analysis = analyze_changes(&current, Some(&previous), now());

        assert_eq!(analysis.resolved.required.len(), 1);
        assert_eq!(analysis.resolved.required[0].text, "Fix injection");
        assert_eq!(analysis.resolved.required[0].resolved_at, Some(now()));
        assert_eq!(analysis.persistent.required.len(), 1);
        assert!(analysis.new.is_empty());
    }

    #[test]
    fn test_re_rendered_item_counts_as_persistent() {
        let previous = set(&["1. Fix injection in search"], &[]);
        let current = set(&["2. ⚠️ **PENDING** Fix injection in search"], &[]);
        let analysis = analyze_changes(&current, Some(&previous), now());

        assert!(analysis.resolved.is_empty());
        assert!(analysis.new.is_empty());
        assert_eq!(analysis.persistent.required.len(), 1);
    }

    #[test]
    fn test_suggestions_are_not_diffed() {
        let previous = RecommendationSet {
            suggestions: vec!["Consider caching".to_string()],
            ..Default::default()
        };
        let current = RecommendationSet::default();
        let analysis = analyze_changes(&current, Some(&previous), now());
        assert!(analysis.resolved.is_empty());
    }

    #[test]
    fn test_identical_rounds_all_persistent() {
        let previous = set(&["Fix injection"], &["Add logging"]);
        let analysis = analyze_changes(&previous, Some(&previous), now());
        assert!(analysis.resolved.is_empty());
        assert!(analysis.new.is_empty());
        assert_eq!(analysis.persistent.len(), 2);
    }

    #[test]
    fn test_order_preserved() {
        let current = set(&["b item", "a item", "c item"], &[]);
        let analysis = analyze_changes(&current, None, now());
        let texts: Vec<&str> = analysis
            .new
            .required
            .iter()
            .map(|i| i.text.as_str())
            .collect();
        assert_eq!(texts, vec!["b item", "a item", "c item"]);
    }

    proptest! {
        /// `resolved ∪ persistent` covers exactly the previous round and
        /// `new ∪ persistent` covers exactly the current round, with no
        /// overlap between resolved and new.
        #[test]
        fn prop_partition_complete(
            prev in proptest::collection::vec("[a-z]{3,12}", 0..8),
            curr in proptest::collection::vec("[a-z]{3,12}", 0..8),
        ) {
            let previous = RecommendationSet {
                required: prev.clone(),
                ..Default::default()
            };
            let current = RecommendationSet {
                required: curr.clone(),
                ..Default::default()
            };
            let analysis = analyze_changes(&current, Some(&previous), now());

            let hashes = |items: &[TrackedItem]| -> HashSet<String> {
                items.iter().map(|i| i.hash.clone()).collect()
            };
            let resolved = hashes(&analysis.resolved.required);
            let new = hashes(&analysis.new.required);
            let persistent = hashes(&analysis.persistent.required);

            let prev_hashes: HashSet<String> =
                prev.iter().map(|t| recommendation_hash(t)).collect();
            let curr_hashes: HashSet<String> =
                curr.iter().map(|t| recommendation_hash(t)).collect();

            prop_assert_eq!(&resolved | &persistent, prev_hashes);
            prop_assert_eq!(&new | &persistent, curr_hashes);
            prop_assert!(resolved.is_disjoint(&new));
        }
    }
}
