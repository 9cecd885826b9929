pub mod analysis;
pub mod identity;
pub mod recommendation;
pub mod render;
pub mod status;
pub mod tracking;
pub mod verdict;

pub use analysis::{analyze_changes, CategoryChanges, ChangeAnalysis, TrackedItem};
pub use identity::{normalize, recommendation_hash, HASH_LEN};
pub use recommendation::{parse_review, Category, RecommendationSet};
pub use render::{comment_marker, is_progress_comment, render_progress_comment};
pub use status::{
    transitions_for, ChannelState, LifecycleEvent, StatusChannel, StatusUpdate, StatusValue,
    WorkflowState,
};
pub use tracking::{CumulativeStats, ReviewSnapshot, TrackingState};
pub use verdict::{classify, classify_all, ApprovalVerdict, VerdictStatus};
