use thiserror::Error;

/// Error classes with distinct handling policies.
///
/// Network and authentication failures degrade to "no prior state" on read
/// paths but abort on write paths; persistence failures are logged and
/// swallowed; validation failures abort before any network call.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("network error {what}: {message}")]
    Network { what: String, message: String },

    #[error("authentication failed {what}: {message}")]
    Authentication { what: String, message: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl GateError {
    /// Whether a read path may treat this failure as "nothing found".
    pub fn is_degradable_read(&self) -> bool {
        matches!(
            self,
            GateError::Network { .. } | GateError::Authentication { .. }
        )
    }
}

/// Validate a commit SHA: full or abbreviated hex, 7 to 64 characters.
pub fn validate_sha(sha: &str) -> Result<(), GateError> {
    if sha.len() >= 7 && sha.len() <= 64 && sha.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(GateError::Validation(format!(
            "invalid commit SHA '{sha}': expected 7-64 hex characters"
        )))
    }
}

/// Validate a pull request number.
pub fn validate_pr_number(pr_number: u64) -> Result<(), GateError> {
    if pr_number == 0 {
        Err(GateError::Validation(
            "pull request number must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}
