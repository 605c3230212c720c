//! Email extraction, junk filtering, and role-priority sorting.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ExtractPolicy;

lazy_static! {
    // Simplified RFC 5322, enough for addresses published on web pages
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();

    // Anchored variant for validating whole candidate strings
    static ref FULL_EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// Scan arbitrary text (raw HTML included) for email-shaped strings.
pub fn find_emails(text: &str) -> Vec<String> {
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Validate, de-junk, dedup, role-sort, and cap email candidates.
///
/// Dedup is case-insensitive and keeps the first casing seen. The sort is
/// stable: addresses whose local part starts with a role prefix come
/// first, in `role_priority` order; everything else keeps its relative
/// order behind them.
pub fn filter_emails(
    candidates: impl IntoIterator<Item = String>,
    policy: &ExtractPolicy,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut emails: Vec<String> = candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| FULL_EMAIL_REGEX.is_match(c))
        .filter(|c| {
            let lower = c.to_lowercase();
            !policy
                .junk_email_fragments
                .iter()
                .any(|junk| lower.contains(junk.as_str()))
        })
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect();

    emails.sort_by_key(|e| role_rank(e, &policy.role_priority));
    emails.truncate(policy.max_emails);
    emails
}

fn role_rank(email: &str, priority: &[String]) -> usize {
    let lower = email.to_lowercase();
    priority
        .iter()
        .position(|p| lower.starts_with(p.as_str()))
        .unwrap_or(priority.len())
}
