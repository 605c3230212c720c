//! Phone number extraction and normalization.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::ExtractPolicy;

lazy_static! {
    // Formats seen on company sites: international prefixes, labeled
    // numbers, Turkish local formats, parenthesized area codes. The
    // labeled pattern captures the number after the label.
    static ref PHONE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\d{10,15}\+").unwrap(),
        Regex::new(r"\+\d{10,15}").unwrap(),
        Regex::new(r"\+\d{1,3}[\s\-]?\d{2,4}[\s\-]?\d{3,4}[\s\-]?\d{3,4}").unwrap(),
        Regex::new(r"\+\d{1,3}[\s\-]?\(\d+\)[\s\-]?[\d\s.\-]+").unwrap(),
        Regex::new(r"(?i)(?:tel|phone|fax|call|mobile)[:\s]+([+\d\s\-()./]+)").unwrap(),
        Regex::new(r"0\d{9,12}").unwrap(),
        Regex::new(r"(?:\+90|0)?\s?[2-5]\d{2}\s?\d{3}\s?\d{2}\s?\d{2}").unwrap(),
        Regex::new(r"(?:\+\d{1,3})?\s?\(0?\d{2,4}\)\s?[\d\s.\-]{6,}").unwrap(),
    ];
}

/// Scan visible text for phone-shaped strings. Returns raw candidates;
/// callers normalize through [`clean_phone`].
pub fn find_phones(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for pattern in PHONE_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(0)) {
                found.push(m.as_str().to_string());
            }
        }
    }
    found
}

/// Normalize a raw candidate to digits with an optional single leading
/// `+`.
///
/// Rejects candidates with fewer than 8 digits when a leading `+` is
/// present, fewer than 10 without one, or more than 15 digits either way.
pub fn clean_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let min_digits = if has_plus { 8 } else { 10 };
    if digits.len() < min_digits || digits.len() > 15 {
        return None;
    }
    Some(if has_plus {
        format!("+{digits}")
    } else {
        digits
    })
}

/// Clean, dedup, and cap phone candidates. Dedup keys on the normalized
/// form; first appearance wins.
pub fn collect_phones(
    candidates: impl IntoIterator<Item = String>,
    policy: &ExtractPolicy,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones: Vec<String> = candidates
        .into_iter()
        .filter_map(|c| clean_phone(&c))
        .filter(|p| seen.insert(p.clone()))
        .collect();
    phones.truncate(policy.max_phones);
    phones
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_international() {
        assert_eq!(
            clean_phone("+964 751 455 4426"),
            Some("+9647514554426".to_string())
        );
        assert_eq!(
            clean_phone("+90 (212) 555-44-33"),
            Some("+902125554433".to_string())
        );
    }

    #[test]
    fn test_clean_local() {
        assert_eq!(clean_phone("0212 555 44 33"), Some("02125554433".to_string()));
    }

    #[test]
    fn test_clean_rejects_short_and_long() {
        // 7 digits with a country code marker
        assert_eq!(clean_phone("+123 45 67"), None);
        // 9 digits without one
        assert_eq!(clean_phone("123 456 789"), None);
        // 16 digits
        assert_eq!(clean_phone("+1234567890123456"), None);
    }

    #[test]
    fn test_clean_keeps_single_leading_plus() {
        let cleaned = clean_phone("+ +49 30 12 34 56 78").unwrap();
        assert!(cleaned.starts_with('+'));
        assert_eq!(cleaned.matches('+').count(), 1);
        assert_eq!(cleaned, "+493012345678");
    }

    #[test]
    fn test_find_labeled_numbers() {
        let text = "Reach us / Tel: +49 30 901820 or Fax: +49 30 901821.";
        let found = find_phones(text);
        assert!(found.iter().any(|p| p.contains("901820")));
        assert!(found.iter().any(|p| p.contains("901821")));
    }

    #[test]
    fn test_find_turkish_format() {
        let text = "Telefon 0212 555 44 33 pbx";
        let found = find_phones(text);
        assert!(found
            .iter()
            .any(|p| clean_phone(p) == Some("02125554433".to_string())));
    }

    #[test]
    fn test_collect_dedups_on_normalized_form() {
        let policy = ExtractPolicy::default();
        let candidates = vec![
            "+90 212 555 44 33".to_string(),
            "+90-212-555-44-33".to_string(),
            "+90 216 777 88 99".to_string(),
        ];
        let phones = collect_phones(candidates, &policy);
        assert_eq!(
            phones,
            vec!["+902125554433".to_string(), "+902167778899".to_string()]
        );
    }

    #[test]
    fn test_collect_caps() {
        let policy = ExtractPolicy {
            max_phones: 1,
            ..ExtractPolicy::default()
        };
        let candidates = vec![
            "+90 212 555 44 33".to_string(),
            "+90 216 777 88 99".to_string(),
        ];
        let phones = collect_phones(candidates, &policy);
        assert_eq!(phones, vec!["+902125554433".to_string()]);
    }
}
