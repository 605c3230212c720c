//! Deterministic scoring and ranking of search hits.
//!
//! No randomness and no wall-clock input: the same hits, tokens, and
//! country always produce the same order, so ranking behavior is fully
//! reproducible in tests.

use std::collections::HashSet;

use url::Url;

use crate::config::SearchPolicy;
use crate::types::SearchHit;

/// URL endings that point at documents rather than sites.
pub const DOC_EXTENSIONS: [&str; 7] = [
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
];

/// Lowercase alphanumeric tokens (length >= 2) from a company name,
/// deduplicated, order preserved.
pub fn company_tokens(name: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

/// Hostname of a URL, lowercased, `www.` stripped. Scheme-less inputs
/// are tried with `https://` prepended.
pub fn host_of(url: &str) -> Option<String> {
    let candidate = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Registrable-domain comparison key: hostname with `www.` stripped.
///
/// Used to decide whether a contact page belongs to the selected
/// website. Sibling subdomains compare equal on their last two labels.
pub fn same_root_domain(a: &str, b: &str) -> bool {
    match (host_of(a), host_of(b)) {
        (Some(ha), Some(hb)) => {
            if ha == hb {
                return true;
            }
            let tail = |h: &str| -> Option<String> {
                let labels: Vec<&str> = h.rsplit('.').take(2).collect();
                (labels.len() == 2).then(|| format!("{}.{}", labels[1], labels[0]))
            };
            match (tail(&ha), tail(&hb)) {
                (Some(ta), Some(tb)) => ta == tb,
                _ => false,
            }
        }
        _ => false,
    }
}

/// Score one hit against company tokens and a country hint.
///
/// +3 per token found in the host, +2 in the title, +1 in the snippet;
/// +2 once if the country appears anywhere; -5 for document-file URLs;
/// -1 per path segment beyond the second.
pub fn score_hit(hit: &SearchHit, tokens: &[String], country: &str) -> i32 {
    let host = host_of(&hit.url).unwrap_or_default();
    let title = hit.title.to_lowercase();
    let snippet = hit.snippet.to_lowercase();

    let mut score = 0i32;
    for token in tokens {
        if host.contains(token.as_str()) {
            score += 3;
        }
        if title.contains(token.as_str()) {
            score += 2;
        }
        if snippet.contains(token.as_str()) {
            score += 1;
        }
    }

    let country = country.trim().to_lowercase();
    if !country.is_empty()
        && (host.contains(&country) || title.contains(&country) || snippet.contains(&country))
    {
        score += 2;
    }

    let (path, segments) = path_info(&hit.url);
    if DOC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        score -= 5;
    }
    if segments > 2 {
        score -= (segments - 2) as i32;
    }

    score
}

/// Fill scores and blocklist flags, then order hits: non-blocklisted by
/// score descending, blocklisted last (also by score). Stable for ties.
pub fn rank_hits(
    mut hits: Vec<SearchHit>,
    tokens: &[String],
    country: &str,
    policy: &SearchPolicy,
) -> Vec<SearchHit> {
    for hit in &mut hits {
        hit.blocklisted = policy.is_blocklisted_url(&hit.url);
        hit.score = score_hit(hit, tokens, country);
    }
    hits.sort_by(|a, b| {
        a.blocklisted
            .cmp(&b.blocklisted)
            .then(b.score.cmp(&a.score))
    });
    hits
}

fn path_info(url: &str) -> (String, usize) {
    let candidate = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    match Url::parse(&candidate) {
        Ok(parsed) => {
            let path = parsed.path().to_lowercase();
            let segments = path.split('/').filter(|s| !s.is_empty()).count();
            (path, segments)
        }
        Err(_) => (String::new(), 0),
    }
}
