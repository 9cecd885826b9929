use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Clone)]
pub struct Config {
    pub github_token: String,
    pub repo_owner: String,
    pub repo_name: String,
    /// Directory for per-PR tracking documents. Defaults to `.reviewgate`.
    pub state_dir: PathBuf,
    /// Comment authors treated as the review bot when reconstructing
    /// history and classifying verdicts.
    pub bot_logins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let github_token = env::var("GITHUB_TOKEN")
            .context("GITHUB_TOKEN environment variable is required")?;

        let repository = env::var("GITHUB_REPOSITORY")
            .context("GITHUB_REPOSITORY environment variable is required")?;
        let (repo_owner, repo_name) = parse_repository(&repository)?;

        let state_dir = env::var("REVIEWGATE_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".reviewgate"));

        let bot_logins = parse_bot_logins(
            &env::var("REVIEWGATE_BOT_LOGINS").unwrap_or_else(|_| "reviewgate[bot]".to_string()),
        );

        Ok(Config {
            github_token,
            repo_owner,
            repo_name,
            state_dir,
            bot_logins,
        })
    }
}

fn parse_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(anyhow!(
            "GITHUB_REPOSITORY must be in 'owner/repo' format, got '{repository}'"
        )),
    }
}

fn parse_bot_logins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
