//! Persistent tracking model for a pull request's review history.
//!
//! `TrackingState` is the document the CLI serializes to disk, one per PR.
//! All mutation goes through [`TrackingState::record_review`]; rebuilding
//! lost state from comment bodies folds through the same path, so the live
//! and reconstructed histories cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::{analyze_changes, ChangeAnalysis};
use crate::recommendation::{parse_review, RecommendationSet};

/// One review round: the parsed recommendations plus provenance.
/// Versions are contiguous from 1 and history is append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSnapshot {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub source_sha: Option<String>,
    pub recommendations: RecommendationSet,
}

/// Identity hash → time the item was first observed resolved.
///
/// Entries are never removed; an item that reappears after resolution is
/// treated as new by the diff but keeps its original resolution record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHashes {
    pub required: BTreeMap<String, DateTime<Utc>>,
    pub important: BTreeMap<String, DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeStats {
    pub total_reviews: u32,
    pub total_resolved_required: u32,
    pub total_resolved_important: u32,
    pub pending_required: u32,
    pub pending_important: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub pr_number: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<ReviewSnapshot>,
    pub resolved: ResolvedHashes,
    pub stats: CumulativeStats,
}

impl TrackingState {
    pub fn new(pr_number: u64, now: DateTime<Utc>) -> Self {
        TrackingState {
            pr_number,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            resolved: ResolvedHashes::default(),
            stats: CumulativeStats::default(),
        }
    }

    pub fn latest(&self) -> Option<&ReviewSnapshot> {
        self.history.last()
    }

    /// The version the next recorded review will receive.
    pub fn next_version(&self) -> u32 {
        self.history.len() as u32 + 1
    }

    /// Record one review round: diff against the latest snapshot, append a
    /// new snapshot, fold newly resolved hashes into the resolved maps
    /// (first resolution time wins), and recompute stats.
    pub fn record_review(
        &mut self,
        recommendations: RecommendationSet,
        source_sha: Option<String>,
        now: DateTime<Utc>,
    ) -> ChangeAnalysis {
        let previous = self.latest().map(|s| s.recommendations.clone());
        let analysis = analyze_changes(&recommendations, previous.as_ref(), now);

        for item in &analysis.resolved.required {
            self.resolved
                .required
                .entry(item.hash.clone())
                .or_insert(item.resolved_at.unwrap_or(now));
        }
        for item in &analysis.resolved.important {
            self.resolved
                .important
                .entry(item.hash.clone())
                .or_insert(item.resolved_at.unwrap_or(now));
        }

        self.history.push(ReviewSnapshot {
            version: self.next_version(),
            timestamp: now,
            source_sha,
            recommendations,
        });
        self.updated_at = now;
        self.recompute_stats();
        analysis
    }

    fn recompute_stats(&mut self) {
        let latest = self.latest();
        self.stats = CumulativeStats {
            total_reviews: self.history.len() as u32,
            total_resolved_required: self.resolved.required.len() as u32,
            total_resolved_important: self.resolved.important.len() as u32,
            pending_required: latest
                .map(|s| s.recommendations.required.len() as u32)
                .unwrap_or(0),
            pending_important: latest
                .map(|s| s.recommendations.important.len() as u32)
                .unwrap_or(0),
        };
    }

    /// Rebuild tracking state by folding prior review comment bodies, in
    /// posting order, through the same record path as live updates. Returns
    /// `None` when there is nothing to fold.
    pub fn reconstruct<I>(pr_number: u64, comments: I) -> Option<TrackingState>
    where
        I: IntoIterator<Item = (String, DateTime<Utc>)>,
    {
        let mut state: Option<TrackingState> = None;
        for (body, timestamp) in comments {
            let recommendations = parse_review(&body);
            let target = state.get_or_insert_with(|| TrackingState::new(pr_number, timestamp));
            target.record_review(recommendations, None, timestamp);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn set(required: &[&str], important: &[&str]) -> RecommendationSet {
        RecommendationSet {
            required: required.iter().map(|s| s.to_string()).collect(),
            important: important.iter().map(|s| s.to_string()).collect(),
            suggestions: Vec::new(),
        }
    }

    #[test]
    fn test_first_review_stats() {
        let mut state = TrackingState::new(42, at("2024-12-13T10:00:00Z"));
        let analysis = state.record_review(
            set(&["Fix injection", "Fix auth"], &["Add logging"]),
            Some("abc1234".to_string()),
            at("2024-12-13T10:00:00Z"),
        );

        assert_eq!(analysis.new.required.len(), 2);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].version, 1);
        assert_eq!(state.stats.total_reviews, 1);
        assert_eq!(state.stats.pending_required, 2);
        assert_eq!(state.stats.pending_important, 1);
        assert_eq!(state.stats.total_resolved_required, 0);
    }

    #[test]
    fn test_versions_are_contiguous() {
        let mut state = TrackingState::new(1, at("2024-12-13T10:00:00Z"));
        for i in 0..3 {
            state.record_review(
                set(&["Fix injection"], &[]),
                None,
                at("2024-12-13T10:00:00Z") + chrono::Duration::hours(i),
            );
        }
        let versions: Vec<u32> = state.history.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[test]
    fn test_resolution_is_recorded_and_monotonic() {
        let mut state = TrackingState::new(1, at("2024-12-13T10:00:00Z"));
        state.record_review(set(&["Fix injection"], &[]), None, at("2024-12-13T10:00:00Z"));
        state.record_review(set(&[], &[]), None, at("2024-12-14T10:00:00Z"));

        assert_eq!(state.stats.total_resolved_required, 1);
        assert_eq!(state.stats.pending_required, 0);
        let first_resolved: Vec<DateTime<Utc>> =
            state.resolved.required.values().copied().collect();

        // Reappears, then resolves again: the original resolution time stands.
        state.record_review(set(&["Fix injection"], &[]), None, at("2024-12-15T10:00:00Z"));
        state.record_review(set(&[], &[]), None, at("2024-12-16T10:00:00Z"));
        let second_resolved: Vec<DateTime<Utc>> =
            state.resolved.required.values().copied().collect();
        assert_eq!(first_resolved, second_resolved);
        assert_eq!(state.stats.total_resolved_required, 1);
    }

    #[test]
    fn test_pending_counts_follow_latest_snapshot() {
        let mut state = TrackingState::new(1, at("2024-12-13T10:00:00Z"));
        state.record_review(set(&["a", "b"], &["c"]), None, at("2024-12-13T10:00:00Z"));
        state.record_review(set(&["b"], &[]), None, at("2024-12-14T10:00:00Z"));

        assert_eq!(state.stats.pending_required, 1);
        assert_eq!(state.stats.pending_important, 0);
        assert_eq!(state.stats.total_resolved_required, 1);
        assert_eq!(state.stats.total_resolved_important, 1);
    }

    #[test]
    fn test_reconstruct_from_no_comments() {
        assert!(TrackingState::reconstruct(1, Vec::new()).is_none());
    }

    #[test]
    fn test_reconstruct_folds_in_order() {
        let round_one = "🔴 REQUIRED\nFix injection\n\nFix auth\n".to_string();
        let round_two = "🔴 REQUIRED\nFix auth\n".to_string();
        let state = TrackingState::reconstruct(
            7,
            vec![
                (round_one, at("2024-12-13T10:00:00Z")),
                (round_two, at("2024-12-14T10:00:00Z")),
            ],
        )
        .unwrap();

        assert_eq!(state.pr_number, 7);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[1].version, 2);
        assert_eq!(state.stats.pending_required, 1);
        assert_eq!(state.stats.total_resolved_required, 1);
        assert_eq!(state.created_at, at("2024-12-13T10:00:00Z"));
        assert_eq!(state.updated_at, at("2024-12-14T10:00:00Z"));
    }

    #[test]
    fn test_reconstruct_matches_live_recording() {
        let bodies = [
            "🔴 REQUIRED\nFix injection\n🟡 IMPORTANT\nAdd logging\n",
            "🔴 REQUIRED\nFix injection\n",
            "All good now.",
        ];
        let times = [
            at("2024-12-13T10:00:00Z"),
            at("2024-12-14T10:00:00Z"),
            at("2024-12-15T10:00:00Z"),
        ];

        let mut live = TrackingState::new(9, times[0]);
        for (body, time) in bodies.iter().zip(times) {
            live.record_review(parse_review(body), None, time);
        }

        let rebuilt = TrackingState::reconstruct(
            9,
            bodies
                .iter()
                .map(|b| b.to_string())
                .zip(times)
                .collect::<Vec<_>>(),
        )
        .unwrap();

        assert_eq!(live, rebuilt);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut state = TrackingState::new(3, at("2024-12-13T10:00:00Z"));
        state.record_review(set(&["Fix it"], &[]), Some("deadbeef".into()), at("2024-12-13T10:00:00Z"));

        let json = serde_json::to_string(&state).unwrap();
        let back: TrackingState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
