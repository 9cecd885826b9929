//! Content-addressed identity for recommendations.
//!
//! A recommendation keeps the same identity hash across review rounds even
//! after the progress comment re-renders it with a status badge, a new
//! ordinal, or an `Applied:` timestamp. The hash is not security-sensitive;
//! it only needs to be deterministic and stable under re-rendering.

use sha2::{Digest, Sha256};

/// Status badges inserted by the comment renderer. Stripped before hashing.
pub const STATUS_BADGES: &[&str] = &[
    "✅ **RESOLVED**",
    "✅ **APPLIED**",
    "⚠️ **PENDING**",
    "⏳ **PENDING**",
    "🆕 **NEW**",
    "🔁 **PERSISTENT**",
];

/// Number of hex characters in an identity hash.
///
/// Short digests admit collisions across unrelated recommendations, but
/// review rounds are small and changing the length would invalidate every
/// already-persisted tracking record, so the truncation stays as-is.
pub const HASH_LEN: usize = 8;

/// Normalize recommendation text for hashing.
///
/// In order: strip a leading `"N. "` ordinal from the first line, strip
/// status-badge substrings, drop `*Applied: <timestamp>*` annotation lines,
/// and trim whitespace per line and overall. Lines left empty by badge
/// removal are dropped entirely.
pub fn normalize(text: &str) -> String {
    let mut lines = Vec::new();
    let mut first = true;

    for raw in text.lines() {
        let mut line = raw.trim().to_string();
        if first {
            line = strip_ordinal(&line);
            first = false;
        }
        for badge in STATUS_BADGES {
            line = line.replace(badge, "");
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with("*Applied:") {
            continue;
        }
        lines.push(line.to_string());
    }

    lines.join("\n")
}

/// Compute the 8-hex-character identity hash of a recommendation.
pub fn recommendation_hash(text: &str) -> String {
    let digest = Sha256::digest(normalize(text).as_bytes());
    hex::encode(&digest[..HASH_LEN / 2])
}

/// Strip a leading `"N. "` ordinal prefix, if present.
fn strip_ordinal(line: &str) -> String {
    let rest = line.trim_start();
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(after) = rest[digits..].strip_prefix('.') {
            return after.trim_start().to_string();
        }
    }
    rest.to_string()
}
