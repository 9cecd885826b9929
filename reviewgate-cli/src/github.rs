//! Token-authenticated GitHub REST client for the handful of endpoints the
//! gate needs: issue comments, pull request reviews, and commit statuses.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use reviewgate_core::{is_progress_comment, ChannelState, StatusChannel, StatusUpdate, StatusValue};

use crate::config::Config;
use crate::error::GateError;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "reviewgate";

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub body: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub user: User,
    pub state: String,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest {
    body: String,
}

#[derive(Debug, Serialize)]
struct CreateStatusRequest {
    state: String,
    context: String,
    description: String,
    target_url: String,
}

#[derive(Debug, Deserialize)]
struct CombinedStatusResponse {
    statuses: Vec<CommitStatus>,
}

#[derive(Debug, Deserialize)]
struct CommitStatus {
    context: String,
    state: String,
    description: Option<String>,
}

impl GithubClient {
    pub fn new(config: &Config) -> Result<Self, GateError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| GateError::Network {
                what: "building HTTP client".to_string(),
                message: e.to_string(),
            })?;
        Ok(GithubClient {
            client,
            token: config.github_token.clone(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
        })
    }

    /// All issue comments on a PR, oldest first.
    pub async fn list_comments(&self, pr_number: u64) -> Result<Vec<Comment>, GateError> {
        let mut all_comments = Vec::new();
        let mut page = 1;
        let per_page = 100;

        info!(
            "Fetching comments for PR #{} in {}/{}",
            pr_number, self.owner, self.repo
        );

        loop {
            let url = format!(
                "{API_BASE}/repos/{}/{}/issues/{}/comments?page={}&per_page={}",
                self.owner, self.repo, pr_number, page, per_page
            );
            let response = self.get(&url, "fetching PR comments").await?;
            let comments: Vec<Comment> =
                response.json().await.map_err(|e| GateError::Network {
                    what: "parsing PR comments response".to_string(),
                    message: e.to_string(),
                })?;

            let fetched = comments.len();
            all_comments.extend(comments);
            if fetched < per_page {
                break;
            }
            page += 1;
        }

        Ok(all_comments)
    }

    /// All formal reviews on a PR, oldest first.
    pub async fn list_reviews(&self, pr_number: u64) -> Result<Vec<Review>, GateError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/pulls/{}/reviews?per_page=100",
            self.owner, self.repo, pr_number
        );
        let response = self.get(&url, "fetching PR reviews").await?;
        response.json().await.map_err(|e| GateError::Network {
            what: "parsing PR reviews response".to_string(),
            message: e.to_string(),
        })
    }

    /// Publish one channel update against a commit.
    pub async fn set_commit_status(
        &self,
        sha: &str,
        update: &StatusUpdate,
        pr_number: u64,
    ) -> Result<(), GateError> {
        let url = format!("{API_BASE}/repos/{}/{}/statuses/{sha}", self.owner, self.repo);
        let body = CreateStatusRequest {
            state: update.value.to_string(),
            context: update.channel.context().to_string(),
            description: update.description.clone(),
            target_url: format!(
                "https://github.com/{}/{}/pull/{pr_number}",
                self.owner, self.repo
            ),
        };

        info!(
            context = update.channel.context(),
            state = %update.value,
            sha,
            "setting commit status"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GateError::Network {
                what: "sending commit status".to_string(),
                message: e.to_string(),
            })?;
        Self::check_status(response, "setting commit status")
            .await
            .map(|_| ())
    }

    /// The latest observed state of each gate channel on a commit.
    pub async fn get_commit_statuses(
        &self,
        sha: &str,
    ) -> Result<(Option<ChannelState>, Option<ChannelState>), GateError> {
        let url = format!(
            "{API_BASE}/repos/{}/{}/commits/{sha}/status",
            self.owner, self.repo
        );
        let response = self.get(&url, "fetching commit status").await?;
        let combined: CombinedStatusResponse =
            response.json().await.map_err(|e| GateError::Network {
                what: "parsing commit status response".to_string(),
                message: e.to_string(),
            })?;

        let mut review = None;
        let mut approval = None;
        // The combined status endpoint reports the most recent status per
        // context, so the first hit for each channel is the current one.
        for status in combined.statuses {
            let Some(value) = StatusValue::parse(&status.state) else {
                continue;
            };
            let state = ChannelState {
                value,
                description: status.description.unwrap_or_default(),
            };
            if status.context == StatusChannel::Review.context() && review.is_none() {
                review = Some(state);
            } else if status.context == StatusChannel::Approval.context() && approval.is_none() {
                approval = Some(state);
            }
        }
        Ok((review, approval))
    }

    /// Post the progress comment, or update ours in place if one exists.
    pub async fn upsert_progress_comment(
        &self,
        pr_number: u64,
        body: &str,
    ) -> Result<(), GateError> {
        let existing = self
            .list_comments(pr_number)
            .await?
            .into_iter()
            .find(|c| is_progress_comment(&c.body));

        match existing {
            Some(comment) => {
                info!(comment_id = comment.id, "updating existing progress comment");
                let url = format!(
                    "{API_BASE}/repos/{}/{}/issues/comments/{}",
                    self.owner, self.repo, comment.id
                );
                let response = self
                    .client
                    .patch(&url)
                    .bearer_auth(&self.token)
                    .header("Accept", "application/vnd.github.v3+json")
                    .json(&CreateCommentRequest {
                        body: body.to_string(),
                    })
                    .send()
                    .await
                    .map_err(|e| GateError::Network {
                        what: "updating progress comment".to_string(),
                        message: e.to_string(),
                    })?;
                Self::check_status(response, "updating progress comment")
                    .await
                    .map(|_| ())
            }
            None => {
                info!("posting new progress comment");
                let url = format!(
                    "{API_BASE}/repos/{}/{}/issues/{}/comments",
                    self.owner, self.repo, pr_number
                );
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .header("Accept", "application/vnd.github.v3+json")
                    .json(&CreateCommentRequest {
                        body: body.to_string(),
                    })
                    .send()
                    .await
                    .map_err(|e| GateError::Network {
                        what: "posting progress comment".to_string(),
                        message: e.to_string(),
                    })?;
                Self::check_status(response, "posting progress comment")
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn get(&self, url: &str, what: &str) -> Result<reqwest::Response, GateError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| GateError::Network {
                what: what.to_string(),
                message: e.to_string(),
            })?;
        Self::check_status(response, what).await
    }

    async fn check_status(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, GateError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(GateError::Authentication {
                what: what.to_string(),
                message: format!("{status} - {message}"),
            })
        } else {
            Err(GateError::Network {
                what: what.to_string(),
                message: format!("{status} - {message}"),
            })
        }
    }
}
