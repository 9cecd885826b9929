use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::Level;

use reviewgate_core::LifecycleEvent;

mod config;
mod error;
mod github;
mod orchestrator;
mod store;

use config::Config;
use orchestrator::Orchestrator;

/// Reviewgate: progressive review tracking and status orchestration
#[derive(Parser, Debug)]
#[command(name = "reviewgate")]
#[command(about = "Progressive review tracking and status orchestration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mark a review as started on both status channels
    StartReview(TargetArgs),
    /// Publish a completed review's outcome to both status channels
    ReviewSuccess(ReviewSuccessArgs),
    /// Mark the review as failed on both status channels
    ReviewFailure(ReviewFailureArgs),
    /// Print the current workflow state for a commit
    GetState(GetStateArgs),
    /// Reset both status channels to pending for re-evaluation
    Reset(TargetArgs),
    /// Ingest a raw review body: track, comment, and publish statuses
    ProcessReview(ProcessReviewArgs),
    /// Classify the reviewer's verdict from the PR's comments
    CheckApproval(CheckApprovalArgs),
    /// Manually approve, overriding the approval channel
    ManualApprove(ManualApproveArgs),
}

#[derive(Parser, Debug)]
struct TargetArgs {
    /// Pull request number
    #[arg(long)]
    pr: u64,

    /// Commit SHA the statuses attach to
    #[arg(long)]
    sha: String,
}

#[derive(Parser, Debug)]
struct ReviewSuccessArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Whether unresolved required issues block approval
    #[arg(long)]
    has_blocking_issues: bool,

    /// Number of open required issues
    #[arg(long, default_value_t = 0)]
    required: u32,

    /// Number of open important improvements
    #[arg(long, default_value_t = 0)]
    important: u32,
}

#[derive(Parser, Debug)]
struct ReviewFailureArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Description for the failed review status
    #[arg(long)]
    message: Option<String>,
}

#[derive(Parser, Debug)]
struct GetStateArgs {
    /// Commit SHA to inspect
    #[arg(long)]
    sha: String,
}

#[derive(Parser, Debug)]
struct ProcessReviewArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// File with the raw review body (stdin if omitted)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Post or update the progress comment on the PR
    #[arg(long)]
    post_comment: bool,
}

#[derive(Parser, Debug)]
struct CheckApprovalArgs {
    /// Pull request number
    #[arg(long)]
    pr: u64,
}

#[derive(Parser, Debug)]
struct ManualApproveArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Login of the person approving manually
    #[arg(long)]
    approver: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let orchestrator = Orchestrator::new(&config)?;

    match cli.command {
        Commands::StartReview(args) => {
            orchestrator
                .publish(args.pr, &args.sha, &LifecycleEvent::ReviewStarted)
                .await
        }
        Commands::ReviewSuccess(args) => {
            orchestrator
                .publish(
                    args.target.pr,
                    &args.target.sha,
                    &LifecycleEvent::ReviewSucceeded {
                        has_blocking_issues: args.has_blocking_issues,
                        required_count: args.required,
                        important_count: args.important,
                    },
                )
                .await
        }
        Commands::ReviewFailure(args) => {
            orchestrator
                .publish(
                    args.target.pr,
                    &args.target.sha,
                    &LifecycleEvent::ReviewFailed {
                        message: args.message,
                    },
                )
                .await
        }
        Commands::GetState(args) => run_get_state(&orchestrator, &args.sha).await,
        Commands::Reset(args) => {
            orchestrator
                .publish(args.pr, &args.sha, &LifecycleEvent::Reset)
                .await
        }
        Commands::ProcessReview(args) => run_process_review(&orchestrator, args).await,
        Commands::CheckApproval(args) => run_check_approval(&orchestrator, args.pr).await,
        Commands::ManualApprove(args) => {
            orchestrator
                .publish(
                    args.target.pr,
                    &args.target.sha,
                    &LifecycleEvent::ManualOverride {
                        approver: args.approver,
                    },
                )
                .await
        }
    }
}

async fn run_get_state(orchestrator: &Orchestrator, sha: &str) -> Result<()> {
    let state = orchestrator.workflow_state(sha).await?;
    let channel = |c: &Option<reviewgate_core::ChannelState>| match c {
        Some(s) => s.value.to_string(),
        None => "none".to_string(),
    };
    println!("review_state={}", channel(&state.review));
    println!("approval_state={}", channel(&state.approval));
    println!("needs_review={}", state.needs_review);
    println!("can_merge={}", state.can_merge);
    Ok(())
}

async fn run_process_review(orchestrator: &Orchestrator, args: ProcessReviewArgs) -> Result<()> {
    let body = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read review body from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read review body from stdin")?;
            buffer
        }
    };

    let result = orchestrator
        .process_review(
            args.target.pr,
            &args.target.sha,
            &body,
            args.post_comment,
            Utc::now(),
        )
        .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            // Leave an explicit failure on both channels rather than a
            // stale pending state, then surface the original error.
            let failed = LifecycleEvent::ReviewFailed {
                message: Some(format!("Review processing failed: {e:#}")),
            };
            if let Err(publish_err) = orchestrator
                .publish(args.target.pr, &args.target.sha, &failed)
                .await
            {
                tracing::warn!("Could not publish failure status: {publish_err:#}");
            }
            return Err(e);
        }
    };

    println!("review_version={}", outcome.review_version);
    println!("required_count={}", outcome.required_count);
    println!("important_count={}", outcome.important_count);
    println!("suggestions_count={}", outcome.suggestions_count);
    println!("has_blocking_issues={}", outcome.has_blocking_issues);
    Ok(())
}

async fn run_check_approval(orchestrator: &Orchestrator, pr_number: u64) -> Result<()> {
    let outcome = orchestrator.check_approval(pr_number).await?;
    println!("status={}", outcome.verdict.status.as_str());
    println!("has_blocking_content={}", outcome.verdict.has_blocking_content);
    println!("reason={}", outcome.verdict.reason);
    println!("already_approved={}", outcome.already_approved);
    Ok(())
}
