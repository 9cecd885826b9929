//! Classifying a reviewer's free-text verdict.
//!
//! Reviews end with a `### FINAL VERDICT` section whose `**Status**` line
//! carries the verdict, in either the bracketed (`[APPROVED]`) or the older
//! plain-text format. Matchers are tried in a fixed order and the first
//! success wins; independent of the verdict, a non-trivial `**CRITICAL
//! ISSUES**` section marks the review as carrying blocking content.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Approved,
    Conditional,
    Blocked,
    Unknown,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Approved => "approved",
            VerdictStatus::Conditional => "conditional",
            VerdictStatus::Blocked => "blocked",
            VerdictStatus::Unknown => "unknown",
        }
    }
}

/// Outcome of classifying one or more review comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalVerdict {
    pub status: VerdictStatus,
    pub has_blocking_content: bool,
    pub reason: String,
}

struct VerdictMatcher {
    name: &'static str,
    pattern: Regex,
}

/// Verdict matchers in precedence order: bracketed format first, the older
/// plain-text format as fallback. First match wins.
static VERDICT_MATCHERS: LazyLock<Vec<VerdictMatcher>> = LazyLock::new(|| {
    vec![
        VerdictMatcher {
            name: "bracketed",
            pattern: Regex::new(r"(?is)### FINAL VERDICT.*?\*\*Status\*\*:\s*\[([^\]]+)\]")
                .expect("bracketed verdict pattern is valid"),
        },
        VerdictMatcher {
            name: "legacy",
            pattern: Regex::new(r"(?is)### FINAL VERDICT.*?\*\*Status\*\*:\s*([^*\n\[]+)")
                .expect("legacy verdict pattern is valid"),
        },
    ]
});

/// Captures the body of a `**CRITICAL ISSUES**` section, ending at the next
/// known section heading or end of input.
static CRITICAL_ISSUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\*\*CRITICAL ISSUES\*\*(.*?)(?:\*\*STRENGTHS\*\*|\*\*AREAS FOR IMPROVEMENT\*\*|\*\*PERFORMANCE CONSIDERATIONS\*\*|\*\*SECURITY ASSESSMENT\*\*|###|\z)",
    )
    .expect("critical issues pattern is valid")
});

static REQUIRED_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CRITICAL:\s*REQUIRED|REQUIRED.*issues?|must\s+be\s+fixed|critical\s+bugs?")
        .expect("required keyword pattern is valid")
});

static APPROVAL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)no\s+critical\s+issues|ready\s+to\s+merge|looks\s+good")
        .expect("approval keyword pattern is valid")
});

static UNIMPLEMENTED_CHANGES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)previous.*changes.*not.*implemented|required.*changes.*missing|still.*need.*to.*address")
        .expect("unimplemented changes pattern is valid")
});

/// Classify a single review comment.
pub fn classify(body: &str) -> ApprovalVerdict {
    let mut status = VerdictStatus::Unknown;

    for matcher in VERDICT_MATCHERS.iter() {
        if let Some(captures) = matcher.pattern.captures(body) {
            let text = captures[1].trim().to_uppercase();
            info!(matcher = matcher.name, status = %text, "found final verdict");
            status = interpret_status_text(&text);
            break;
        }
    }

    let mut has_blocking_content = has_critical_section(body);

    // Keyword fallback, only when no verdict section was found.
    if status == VerdictStatus::Unknown {
        if REQUIRED_KEYWORDS.is_match(body) {
            status = VerdictStatus::Blocked;
            has_blocking_content = true;
        } else if APPROVAL_KEYWORDS.is_match(body) {
            status = VerdictStatus::Approved;
        }
    }

    // A blocked verdict always counts as blocking content, whether or not a
    // critical-issues section spelled the problems out.
    if status == VerdictStatus::Blocked {
        has_blocking_content = true;
    }

    ApprovalVerdict {
        reason: status_reason(status, has_blocking_content),
        status,
        has_blocking_content,
    }
}

/// Classify a sequence of review comments in posting order.
///
/// The verdict of the last comment wins; `has_blocking_content` accumulates
/// across all comments. An approved verdict is overridden to blocked when
/// any comment says earlier required changes were not implemented.
pub fn classify_all<'a, I>(bodies: I) -> ApprovalVerdict
where
    I: IntoIterator<Item = &'a str>,
{
    let mut status = VerdictStatus::Unknown;
    let mut has_blocking_content = false;
    let mut combined = String::new();

    for body in bodies {
        let verdict = classify(body);
        status = verdict.status;
        has_blocking_content |= verdict.has_blocking_content;
        combined.push_str(body);
        combined.push_str("\n\n");
    }

    if status == VerdictStatus::Approved && UNIMPLEMENTED_CHANGES.is_match(&combined) {
        info!("previous required changes not implemented, overriding verdict to blocked");
        status = VerdictStatus::Blocked;
        has_blocking_content = true;
    }

    ApprovalVerdict {
        reason: status_reason(status, has_blocking_content),
        status,
        has_blocking_content,
    }
}

fn interpret_status_text(text: &str) -> VerdictStatus {
    if text.contains("CONDITIONAL APPROVAL") {
        VerdictStatus::Conditional
    } else if text.contains("BLOCKED") {
        VerdictStatus::Blocked
    } else if text.contains("APPROVED") {
        VerdictStatus::Approved
    } else {
        VerdictStatus::Unknown
    }
}

/// A critical-issues section counts as blocking only when its content is
/// substantial: longer than 10 characters and not just whitespace, dashes,
/// and underscores.
fn has_critical_section(body: &str) -> bool {
    let Some(captures) = CRITICAL_ISSUES.captures(body) else {
        return false;
    };
    let content = captures[1].trim();
    content.len() > 10 && !content.chars().all(|c| c.is_whitespace() || c == '-' || c == '_')
}

fn status_reason(status: VerdictStatus, has_blocking_content: bool) -> String {
    match status {
        VerdictStatus::Approved if has_blocking_content => {
            "approved but required issues remain".to_string()
        }
        VerdictStatus::Approved => "approved with no critical issues".to_string(),
        VerdictStatus::Conditional => "conditionally approved".to_string(),
        VerdictStatus::Blocked => "blocked with critical issues".to_string(),
        VerdictStatus::Unknown => "no final verdict found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_approved() {
        let body = "### FINAL VERDICT\n**Status**: [APPROVED]\n";
        let verdict = classify(body);
        assert_eq!(verdict.status, VerdictStatus::Approved);
        assert!(!verdict.has_blocking_content);
    }

    #[test]
    fn test_bracketed_blocked() {
        let body = "### FINAL VERDICT\n**Status**: [BLOCKED]\n";
        let verdict = classify(body);
        assert_eq!(verdict.status, VerdictStatus::Blocked);
        assert!(verdict.has_blocking_content);
    }

    #[test]
    fn test_legacy_blocked_is_blocking() {
        let verdict = classify("### FINAL VERDICT\n**Status**: BLOCKED");
        assert_eq!(verdict.status, VerdictStatus::Blocked);
        assert!(verdict.has_blocking_content);
    }

    #[test]
    fn test_bracketed_conditional() {
        let body = "### FINAL VERDICT\n**Status**: [CONDITIONAL APPROVAL]\n";
        assert_eq!(classify(body).status, VerdictStatus::Conditional);
    }

    #[test]
    fn test_legacy_plain_text_format() {
        let body = "### FINAL VERDICT\n**Status**: APPROVED\n";
        assert_eq!(classify(body).status, VerdictStatus::Approved);
    }

    #[test]
    fn test_bracketed_takes_precedence_over_legacy() {
        // Both formats present; the bracketed one decides.
        let body = "### FINAL VERDICT\n**Status**: [BLOCKED]\nolder note **Status**: APPROVED\n";
        assert_eq!(classify(body).status, VerdictStatus::Blocked);
    }

    #[test]
    fn test_critical_section_sets_blocking_even_when_approved() {
        let body = "\
**CRITICAL ISSUES**
SQL injection in the search endpoint must be fixed before release.

**STRENGTHS**
Good test coverage.

### FINAL VERDICT
**Status**: [APPROVED]
";
        let verdict = classify(body);
        assert_eq!(verdict.status, VerdictStatus::Approved);
        assert!(verdict.has_blocking_content);
        assert_eq!(verdict.reason, "approved but required issues remain");
    }

    #[test]
    fn test_empty_critical_section_is_not_blocking() {
        let body = "**CRITICAL ISSUES**\n- _ -\n### FINAL VERDICT\n**Status**: [APPROVED]\n";
        assert!(!classify(body).has_blocking_content);
    }

    #[test]
    fn test_keyword_fallback_blocked() {
        let body = "There are issues that must be fixed before this can land.";
        let verdict = classify(body);
        assert_eq!(verdict.status, VerdictStatus::Blocked);
        assert!(verdict.has_blocking_content);
    }

    #[test]
    fn test_keyword_fallback_approved() {
        let verdict = classify("Overall this looks good, ready to merge.");
        assert_eq!(verdict.status, VerdictStatus::Approved);
        assert!(!verdict.has_blocking_content);
    }

    #[test]
    fn test_verdict_section_suppresses_keyword_fallback() {
        // "looks good" would approve via fallback, but the explicit verdict wins.
        let body = "The tests look good.\n### FINAL VERDICT\n**Status**: [BLOCKED]\n";
        assert_eq!(classify(body).status, VerdictStatus::Blocked);
    }

    #[test]
    fn test_no_signal_is_unknown() {
        let verdict = classify("Thanks for the contribution.");
        assert_eq!(verdict.status, VerdictStatus::Unknown);
        assert_eq!(verdict.reason, "no final verdict found");
    }

    #[test]
    fn test_last_comment_verdict_wins() {
        let verdict = classify_all([
            "### FINAL VERDICT\n**Status**: [BLOCKED]",
            "### FINAL VERDICT\n**Status**: [APPROVED]",
        ]);
        assert_eq!(verdict.status, VerdictStatus::Approved);
    }

    #[test]
    fn test_blocking_content_accumulates_across_comments() {
        let verdict = classify_all([
            "**CRITICAL ISSUES**\nMissing input validation on the upload path.\n###",
            "### FINAL VERDICT\n**Status**: [APPROVED]",
        ]);
        assert_eq!(verdict.status, VerdictStatus::Approved);
        assert!(verdict.has_blocking_content);
    }

    #[test]
    fn test_unimplemented_changes_override_approval() {
        let verdict = classify_all([
            "The previous review's changes were not implemented yet.",
            "### FINAL VERDICT\n**Status**: [APPROVED]",
        ]);
        assert_eq!(verdict.status, VerdictStatus::Blocked);
        assert!(verdict.has_blocking_content);
    }

    #[test]
    fn test_override_does_not_apply_to_blocked() {
        let verdict = classify_all([
            "still need to address the feedback",
            "### FINAL VERDICT\n**Status**: [CONDITIONAL APPROVAL]",
        ]);
        assert_eq!(verdict.status, VerdictStatus::Conditional);
    }

    #[test]
    fn test_no_comments_is_unknown() {
        let verdict = classify_all(std::iter::empty::<&str>());
        assert_eq!(verdict.status, VerdictStatus::Unknown);
        assert!(!verdict.has_blocking_content);
    }
}
