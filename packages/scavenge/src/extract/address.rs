//! Address candidate extraction from visible text.
//!
//! Addresses stay opaque display strings; nothing here decomposes them
//! into street/city/postal fields. Structured sources (`<address>` tags,
//! JSON-LD) live in the `html` module; this module handles the fuzzy
//! text-window heuristic.

use std::collections::HashSet;

use crate::config::ExtractPolicy;

/// Characters of context taken before a marker match.
const WINDOW_BEFORE: usize = 50;

/// Characters of context taken after a marker match.
const WINDOW_AFTER: usize = 150;

/// Candidates worth keeping must be longer than this.
const MIN_CANDIDATE_CHARS: usize = 10;

/// Text windows around address-marker words.
///
/// For each marker's first occurrence, the surrounding window of the
/// original text becomes one candidate. Markers are expected lowercase;
/// matching is case-insensitive against the text.
pub fn window_candidates(text: &str, markers_lower: &[String]) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut candidates = Vec::new();
    for marker in markers_lower {
        if marker.is_empty() {
            continue;
        }
        if let Some(idx) = lower.find(marker.as_str()) {
            // Lowercasing can shift byte offsets for a few scripts, so
            // clamp the window to char boundaries of the original text.
            let start = floor_char_boundary(text, idx.saturating_sub(WINDOW_BEFORE));
            let end = ceil_char_boundary(text, idx.saturating_add(WINDOW_AFTER));
            if start >= end {
                continue;
            }
            let candidate = text[start..end].trim();
            if candidate.chars().count() > MIN_CANDIDATE_CHARS {
                candidates.push(candidate.to_string());
            }
        }
    }
    candidates
}

/// Dedup (exact) and cap address candidates, preserving order.
pub fn collect_addresses(
    candidates: impl IntoIterator<Item = String>,
    policy: &ExtractPolicy,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut addresses: Vec<String> = candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.chars().count() > MIN_CANDIDATE_CHARS)
        .filter(|c| seen.insert(c.clone()))
        .collect();
    addresses.truncate(policy.max_addresses);
    addresses
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
