//! Commit status state machine.
//!
//! Each lifecycle event maps to a list of status updates, expressed as data
//! rather than performed directly. The invocation layer interprets the
//! updates against the commit status API; keeping the mapping pure makes
//! the whole transition table testable without any network.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two commit status channels this system owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusChannel {
    Review,
    Approval,
}

impl StatusChannel {
    /// The commit-status context string for this channel.
    pub fn context(&self) -> &'static str {
        match self {
            StatusChannel::Review => "reviewgate/review",
            StatusChannel::Approval => "reviewgate/approval",
        }
    }
}

/// Commit status values as the status API understands them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusValue {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusValue {
    pub fn parse(s: &str) -> Option<StatusValue> {
        match s {
            "pending" => Some(StatusValue::Pending),
            "success" => Some(StatusValue::Success),
            "failure" => Some(StatusValue::Failure),
            "error" => Some(StatusValue::Error),
            _ => None,
        }
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusValue::Pending => "pending",
            StatusValue::Success => "success",
            StatusValue::Failure => "failure",
            StatusValue::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The observed state of one channel on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub value: StatusValue,
    pub description: String,
}

/// One status write the interpreter must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub channel: StatusChannel,
    pub value: StatusValue,
    pub description: String,
}

/// Lifecycle events that drive the two channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    ReviewStarted,
    ReviewSucceeded {
        has_blocking_issues: bool,
        required_count: u32,
        important_count: u32,
    },
    ReviewFailed {
        message: Option<String>,
    },
    ManualOverride {
        approver: String,
    },
    Reset,
}

/// The status updates a lifecycle event requires, in publication order.
pub fn transitions_for(event: &LifecycleEvent) -> Vec<StatusUpdate> {
    match event {
        LifecycleEvent::ReviewStarted => vec![
            update(
                StatusChannel::Review,
                StatusValue::Pending,
                "Review in progress...",
            ),
            update(
                StatusChannel::Approval,
                StatusValue::Pending,
                "Waiting for review to complete",
            ),
        ],
        LifecycleEvent::ReviewSucceeded {
            has_blocking_issues,
            required_count,
            important_count,
        } => {
            let review_description = if *required_count > 0 {
                format!("Review completed - {required_count} required issue(s) found")
            } else if *important_count > 0 {
                format!("Review completed - {important_count} improvement(s) recommended")
            } else {
                "Review completed - no issues found".to_string()
            };

            let approval = if *has_blocking_issues {
                // A blocked approval reads pending, not failure; failure is
                // reserved for the review service itself breaking.
                update(
                    StatusChannel::Approval,
                    StatusValue::Pending,
                    &format!("Blocked: {required_count} required issue(s) must be resolved"),
                )
            } else {
                update(
                    StatusChannel::Approval,
                    StatusValue::Success,
                    "Approved: no blocking issues found",
                )
            };

            vec![
                update(StatusChannel::Review, StatusValue::Success, &review_description),
                approval,
            ]
        }
        LifecycleEvent::ReviewFailed { message } => vec![
            update(
                StatusChannel::Review,
                StatusValue::Failure,
                message.as_deref().unwrap_or("Review service unavailable"),
            ),
            update(
                StatusChannel::Approval,
                StatusValue::Failure,
                "Manual review required - automated review unavailable",
            ),
        ],
        LifecycleEvent::ManualOverride { approver } => vec![update(
            StatusChannel::Approval,
            StatusValue::Success,
            &format!("Manually approved by {approver}"),
        )],
        LifecycleEvent::Reset => vec![
            update(
                StatusChannel::Review,
                StatusValue::Pending,
                "Waiting for review...",
            ),
            update(
                StatusChannel::Approval,
                StatusValue::Pending,
                "Waiting for review to complete",
            ),
        ],
    }
}

fn update(channel: StatusChannel, value: StatusValue, description: &str) -> StatusUpdate {
    StatusUpdate {
        channel,
        value,
        description: description.to_string(),
    }
}

/// Summary of both channels on a commit, with the derived workflow answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub review: Option<ChannelState>,
    pub approval: Option<ChannelState>,
    pub needs_review: bool,
    pub can_merge: bool,
}

impl WorkflowState {
    /// Derive the workflow answers from the observed channel states.
    ///
    /// A missing channel counts as pending. Review is needed while either
    /// channel is missing, pending, or failed; the branch is mergeable
    /// exactly when the approval channel reads success.
    pub fn derive(review: Option<ChannelState>, approval: Option<ChannelState>) -> WorkflowState {
        let unsettled = |state: &Option<ChannelState>| match state {
            None => true,
            Some(s) => matches!(s.value, StatusValue::Pending | StatusValue::Failure),
        };
        let needs_review = unsettled(&review) || unsettled(&approval);
        let can_merge = matches!(
            approval,
            Some(ChannelState {
                value: StatusValue::Success,
                ..
            })
        );
        WorkflowState {
            review,
            approval,
            needs_review,
            can_merge,
        }
    }
}
