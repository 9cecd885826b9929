//! Ties the pure domain logic to GitHub and the local store, applying the
//! degradation policy: reads fall back to "nothing found" with a warning,
//! writes fail the invocation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use reviewgate_core::{
    classify_all, parse_review, render_progress_comment, transitions_for, ApprovalVerdict,
    LifecycleEvent, TrackingState, WorkflowState,
};

use crate::config::Config;
use crate::error::{validate_pr_number, validate_sha};
use crate::github::{Comment, GithubClient};
use crate::store::TrackingStore;

pub struct Orchestrator {
    github: GithubClient,
    store: TrackingStore,
    bot_logins: Vec<String>,
}

/// Result of ingesting one review, printed as `key=value` output.
pub struct ProcessOutcome {
    pub review_version: u32,
    pub required_count: u32,
    pub important_count: u32,
    pub suggestions_count: u32,
    pub has_blocking_issues: bool,
}

/// Result of classifying the reviewer's verdict for a PR.
pub struct ApprovalOutcome {
    pub verdict: ApprovalVerdict,
    pub already_approved: bool,
}

/// A comment counts as review input when a configured bot wrote it and it
/// is not one of our own progress comments.
pub fn is_bot_review_comment(comment: &Comment, bot_logins: &[String]) -> bool {
    bot_logins.iter().any(|l| l == &comment.user.login)
        && !reviewgate_core::is_progress_comment(&comment.body)
}

impl Orchestrator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Orchestrator {
            github: GithubClient::new(config).context("Failed to create GitHub client")?,
            store: TrackingStore::new(config.state_dir.clone()),
            bot_logins: config.bot_logins.clone(),
        })
    }

    /// Publish every status update a lifecycle event requires. Write
    /// failures abort.
    pub async fn publish(
        &self,
        pr_number: u64,
        sha: &str,
        event: &LifecycleEvent,
    ) -> Result<()> {
        validate_pr_number(pr_number)?;
        validate_sha(sha)?;
        for update in transitions_for(event) {
            self.github
                .set_commit_status(sha, &update, pr_number)
                .await
                .with_context(|| format!("Failed to publish {}", update.channel.context()))?;
        }
        Ok(())
    }

    /// Read both channels for a commit and derive the workflow answers.
    pub async fn workflow_state(&self, sha: &str) -> Result<WorkflowState> {
        validate_sha(sha)?;
        let (review, approval) = self
            .github
            .get_commit_statuses(sha)
            .await
            .context("Failed to read commit statuses")?;
        Ok(WorkflowState::derive(review, approval))
    }

    /// Full ingestion pipeline for one review body: parse, fold into the
    /// tracking history, persist best-effort, render and (optionally) post
    /// the progress comment, and publish the resulting statuses.
    pub async fn process_review(
        &self,
        pr_number: u64,
        sha: &str,
        review_body: &str,
        post_comment: bool,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome> {
        validate_pr_number(pr_number)?;
        validate_sha(sha)?;

        let recommendations = parse_review(review_body);
        let mut state = self.load_or_reconstruct(pr_number, now).await?;
        let analysis = state.record_review(recommendations, Some(sha.to_string()), now);

        if let Err(e) = self.store.save(&state) {
            warn!("Continuing without persisted tracking state: {e}");
        }

        let outcome = ProcessOutcome {
            review_version: state.latest().map(|s| s.version).unwrap_or(0),
            required_count: state.stats.pending_required,
            important_count: state.stats.pending_important,
            suggestions_count: state
                .latest()
                .map(|s| s.recommendations.suggestions.len() as u32)
                .unwrap_or(0),
            has_blocking_issues: state.stats.pending_required > 0,
        };

        if post_comment {
            let body = render_progress_comment(&state, &analysis);
            self.github
                .upsert_progress_comment(pr_number, &body)
                .await
                .context("Failed to post progress comment")?;
        }

        self.publish(
            pr_number,
            sha,
            &LifecycleEvent::ReviewSucceeded {
                has_blocking_issues: outcome.has_blocking_issues,
                required_count: outcome.required_count,
                important_count: outcome.important_count,
            },
        )
        .await?;

        Ok(outcome)
    }

    /// Classify the reviewer's verdict from the PR's bot comments and check
    /// whether a formal bot approval already exists.
    pub async fn check_approval(&self, pr_number: u64) -> Result<ApprovalOutcome> {
        validate_pr_number(pr_number)?;

        let verdict = match self.github.list_comments(pr_number).await {
            Ok(comments) => {
                let bodies: Vec<&str> = comments
                    .iter()
                    .filter(|c| is_bot_review_comment(c, &self.bot_logins))
                    .map(|c| c.body.as_str())
                    .collect();
                info!("Classifying verdict from {} bot comment(s)", bodies.len());
                classify_all(bodies)
            }
            Err(e) if e.is_degradable_read() => {
                warn!("Could not fetch comments, treating verdict as unknown: {e}");
                classify_all(std::iter::empty::<&str>())
            }
            Err(e) => return Err(e.into()),
        };

        let already_approved = match self.github.list_reviews(pr_number).await {
            Ok(reviews) => reviews
                .iter()
                .any(|r| r.state == "APPROVED" && self.bot_logins.contains(&r.user.login)),
            Err(e) if e.is_degradable_read() => {
                warn!("Could not fetch reviews, assuming no existing approval: {e}");
                false
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ApprovalOutcome {
            verdict,
            already_approved,
        })
    }

    /// Local document if present, else a fold over prior bot review
    /// comments, else a fresh state. Read failures on either source degrade
    /// with a warning.
    async fn load_or_reconstruct(
        &self,
        pr_number: u64,
        now: DateTime<Utc>,
    ) -> Result<TrackingState> {
        match self.store.load(pr_number) {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable tracking document: {e}"),
        }

        let comments = match self.github.list_comments(pr_number).await {
            Ok(comments) => comments,
            Err(e) if e.is_degradable_read() => {
                warn!("Could not fetch comments for reconstruction, starting fresh: {e}");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let review_bodies: Vec<(String, DateTime<Utc>)> = comments
            .into_iter()
            .filter(|c| is_bot_review_comment(c, &self.bot_logins))
            .map(|c| (c.body, c.created_at))
            .collect();

        if let Some(state) = TrackingState::reconstruct(pr_number, review_bodies) {
            info!(
                "Reconstructed tracking state for PR #{pr_number}: {} review(s)",
                state.history.len()
            );
            Ok(state)
        } else {
            Ok(TrackingState::new(pr_number, now))
        }
    }
}
