//! Rendering the progress comment for a pull request.
//!
//! The rendered body is itself valid parser input: open Required/Important
//! items sit under their category-marker headings, so folding the comment
//! back through the parser reproduces them, and identity hashes survive the
//! added ordinals, status badges, and `Applied:` annotations. Resolved items
//! are listed before the first marker heading, where the parser ignores
//! them. A hidden marker line identifies the comment as ours.

use std::fmt::Write as _;

use crate::analysis::{ChangeAnalysis, TrackedItem};
use crate::recommendation::RecommendationSet;
use crate::tracking::TrackingState;

/// Prefix of the hidden marker line carried by every rendered comment.
pub const COMMENT_MARKER_PREFIX: &str = "<!-- reviewgate(";

/// The full marker line for a given review version.
pub fn comment_marker(version: u32) -> String {
    format!("{COMMENT_MARKER_PREFIX}v{version}) -->")
}

/// Whether a comment body was produced by [`render_progress_comment`].
pub fn is_progress_comment(body: &str) -> bool {
    body.contains(COMMENT_MARKER_PREFIX)
}

/// Render the progress comment after a review has been recorded.
///
/// `state` must already contain the review round being rendered (its latest
/// snapshot) and `analysis` is the diff that round produced.
pub fn render_progress_comment(state: &TrackingState, analysis: &ChangeAnalysis) -> String {
    let empty = RecommendationSet::default();
    let (version, current) = match state.latest() {
        Some(snapshot) => (snapshot.version, &snapshot.recommendations),
        None => (0, &empty),
    };
    let first_review = state.history.len() <= 1;

    let mut out = String::new();
    let _ = writeln!(out, "{}", comment_marker(version));
    out.push_str("## 🤖 Automated Review Progress\n\n");
    let _ = writeln!(
        out,
        "**Review round**: {version} ({} total)",
        state.stats.total_reviews
    );
    let _ = writeln!(out, "**Updated**: {}\n", state.updated_at.to_rfc3339());

    out.push_str("### 📊 Implementation Status\n\n");
    out.push_str("| Category | Open | Resolved | Status |\n");
    out.push_str("|----------|------|----------|--------|\n");
    let _ = writeln!(
        out,
        "| 🔴 **REQUIRED** | {} | {} | {} |",
        state.stats.pending_required,
        state.stats.total_resolved_required,
        completion_cell(state.stats.pending_required)
    );
    let _ = writeln!(
        out,
        "| 🟡 **IMPORTANT** | {} | {} | {} |\n",
        state.stats.pending_important,
        state.stats.total_resolved_important,
        completion_cell(state.stats.pending_important)
    );

    out.push_str("### 📋 Next Steps\n\n");
    if state.stats.pending_required > 0 {
        let _ = writeln!(
            out,
            "❌ **{} required issue(s) must be addressed before this PR can be approved.**",
            state.stats.pending_required
        );
    } else {
        out.push_str("✅ **No blocking issues found - ready for approval.**\n");
    }
    if state.stats.pending_important > 0 {
        let _ = writeln!(
            out,
            "⏳ **{} improvement(s) are recommended but not required for approval.**",
            state.stats.pending_important
        );
    }
    out.push_str("\n*This comment updates automatically when new changes are pushed.*\n\n");

    // Everything below the divider is valid parser input; summary text and
    // resolved items stay above the first category heading so they are not
    // picked back up as open items when this comment is re-parsed.
    let resolved_count = analysis.resolved.len();
    if resolved_count > 0 {
        let _ = writeln!(out, "### ✅ Resolved in this round ({resolved_count})\n");
        for item in analysis
            .resolved
            .required
            .iter()
            .chain(&analysis.resolved.important)
        {
            let _ = writeln!(out, "- ~~{}~~{}", summary_line(&item.text), applied_note(item));
        }
        out.push('\n');
    }

    out.push_str("---\n\n");

    if !current.required.is_empty() {
        out.push_str("### 🔴 REQUIRED Issues (Must Fix Before Merge)\n\n");
        render_items(&mut out, &current.required, "⚠️ **PENDING**", analysis, true, first_review);
    }

    if !current.important.is_empty() {
        out.push_str("### 🟡 IMPORTANT Improvements (Recommended)\n\n");
        render_items(&mut out, &current.important, "⏳ **PENDING**", analysis, false, first_review);
    }

    if !current.suggestions.is_empty() {
        out.push_str("### 🔵 SUGGESTIONS (Optional)\n\n");
        for (index, text) in current.suggestions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}\n", index + 1, indent_continuation(text));
        }
    }

    out
}

fn render_items(
    out: &mut String,
    items: &[String],
    pending_badge: &str,
    analysis: &ChangeAnalysis,
    required: bool,
    first_review: bool,
) {
    let new_hashes: Vec<&str> = if required {
        analysis.new.required.iter().map(|i| i.hash.as_str()).collect()
    } else {
        analysis.new.important.iter().map(|i| i.hash.as_str()).collect()
    };

    for (index, text) in items.iter().enumerate() {
        let hash = crate::identity::recommendation_hash(text);
        let tag = if first_review {
            ""
        } else if new_hashes.contains(&hash.as_str()) {
            " 🆕 **NEW**"
        } else {
            " 🔁 **PERSISTENT**"
        };
        let _ = writeln!(out, "{}. {pending_badge}{tag}", index + 1);
        let _ = writeln!(out, "   {}\n", indent_continuation(text));
    }
}

/// Join an item's lines with three-space continuation indents.
fn indent_continuation(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n   ")
}

/// First line of an item, truncated for the resolved list.
fn summary_line(text: &str) -> String {
    let first = text.lines().next().unwrap_or("");
    let mut line: String = first.chars().take(80).collect();
    if line.len() < first.len() {
        line.push('…');
    }
    line
}

fn applied_note(item: &TrackedItem) -> String {
    match item.resolved_at {
        Some(at) => format!(" *Applied: {}*", at.format("%Y-%m-%d")),
        None => String::new(),
    }
}

fn completion_cell(pending: u32) -> &'static str {
    if pending == 0 {
        "✅ Complete"
    } else {
        "⏳ Pending"
    }
}
