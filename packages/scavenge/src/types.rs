//! Data model for the contact-discovery pipeline.
//!
//! `ContactQuery` goes in, `ScavengeReport` comes out; everything else is
//! working state scoped to one run. The binding invariant: every email and
//! phone on a `ContactResult` must appear in the `emails_found`/
//! `phones_found` of at least one `sources` entry, i.e. it was seen on a
//! page the pipeline actually fetched. Search-snippet data is a hint and
//! never reaches the final result directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable input for one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactQuery {
    /// Company name as supplied by the caller, possibly misspelled or
    /// unromanized.
    pub company_name: String,

    /// Free-text country hint, may be empty.
    pub country_hint: String,
}

impl ContactQuery {
    /// Create a query, trimming surrounding whitespace.
    pub fn new(company_name: impl Into<String>, country_hint: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into().trim().to_string(),
            country_hint: country_hint.into().trim().to_string(),
        }
    }

    /// Whether there is anything to search for.
    pub fn is_empty(&self) -> bool {
        self.company_name.is_empty()
    }
}

/// Output of the name-correction step; localizes downstream heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectedIdentity {
    /// Corrected, romanized company name.
    #[serde(alias = "corrected_name")]
    pub company_name: String,

    /// Country the company most likely operates from.
    #[serde(default)]
    pub country: String,

    /// ISO-ish language code for the company's home market, e.g. `tr`.
    #[serde(default)]
    pub language_code: String,

    /// Words meaning "contact" in the company's languages.
    #[serde(default)]
    pub contact_keywords: Vec<String>,

    /// Words meaning "address" in the company's languages.
    #[serde(default)]
    pub address_keywords: Vec<String>,
}

impl CorrectedIdentity {
    /// Identity used when the correction call fails: the raw input,
    /// untouched, with no extra localizations.
    pub fn fallback(query: &ContactQuery) -> Self {
        Self {
            company_name: query.company_name.clone(),
            country: query.country_hint.clone(),
            language_code: String::new(),
            contact_keywords: vec![],
            address_keywords: vec![],
        }
    }
}

/// One raw search-engine result, scored during ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title.
    pub title: String,

    /// Result snippet. Hint-only; snippet data never reaches the final
    /// result unverified.
    pub snippet: String,

    /// Result URL.
    pub url: String,

    /// Relevance score from company-token overlap; filled by ranking.
    #[serde(default)]
    pub score: i32,

    /// Whether the URL's host is on the domain blocklist; filled by
    /// ranking. Blocklisted hits rank last and are never fetched.
    #[serde(default)]
    pub blocklisted: bool,
}

impl SearchHit {
    /// Create an unranked hit.
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
            score: 0,
            blocklisted: false,
        }
    }
}

/// Everything extracted from one fetched page. Cached keyed by the
/// normalized request URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFetchResult {
    /// The normalized URL the fetch was asked for.
    pub requested_url: String,

    /// URL after redirects and contact-page adoption.
    pub final_url: String,

    /// Filtered, role-sorted emails found on the page.
    pub emails: Vec<String>,

    /// Cleaned, deduplicated phone numbers found on the page.
    pub phones: Vec<String>,

    /// Raw address text candidates, opaque display strings.
    pub address_candidates: Vec<String>,

    /// Visible page text, whitespace-collapsed and length-capped.
    pub text_preview: String,

    /// Wall time spent on the fetch, retries included.
    #[serde(rename = "fetch_latency_ms", with = "duration_ms")]
    pub fetch_latency: Duration,

    /// Set when the fetch failed; implies empty signal collections.
    pub error: Option<String>,
}

impl PageFetchResult {
    /// A failed fetch, carrying only the error and latency.
    pub fn failure(
        requested_url: impl Into<String>,
        error: impl std::fmt::Display,
        fetch_latency: Duration,
    ) -> Self {
        let requested_url = requested_url.into();
        Self {
            final_url: requested_url.clone(),
            requested_url,
            emails: vec![],
            phones: vec![],
            address_candidates: vec![],
            text_preview: String::new(),
            fetch_latency,
            error: Some(error.to_string()),
        }
    }

    /// Whether the page yielded any contact signal.
    pub fn has_signals(&self) -> bool {
        !self.emails.is_empty() || !self.phones.is_empty() || !self.address_candidates.is_empty()
    }
}

/// How a source page entered the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The selected official website, fetched eagerly by the search
    /// adapter.
    Website,

    /// The selected contact page, fetched eagerly by the search adapter.
    ContactPage,

    /// A page the model asked for directly via the fetch tool.
    Page,
}

/// One fetched page in the run's evidence log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSource {
    /// How the page entered the run.
    #[serde(rename = "type")]
    pub kind: SourceKind,

    /// The page's final URL.
    pub url: String,

    /// Emails seen on this page.
    pub emails_found: Vec<String>,

    /// Phones seen on this page.
    pub phones_found: Vec<String>,

    /// First address candidate from this page, if any.
    pub address_snippet: Option<String>,
}

impl ContactSource {
    /// Build a source entry from a fetch result.
    pub fn from_fetch(kind: SourceKind, fetch: &PageFetchResult) -> Self {
        Self {
            kind,
            url: fetch.final_url.clone(),
            emails_found: fetch.emails.clone(),
            phones_found: fetch.phones.clone(),
            address_snippet: fetch.address_candidates.first().cloned(),
        }
    }
}

/// How much the verified evidence supports the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// At least one verified email plus a verified phone or an address.
    High,

    /// Some verified contact field or an address, but not enough for
    /// `High`.
    Medium,

    /// No verified email, no verified phone, no address.
    #[default]
    Low,
}

impl Confidence {
    /// Grade a sealed result. The model's own claim is ignored.
    pub fn grade(has_email: bool, has_phone: bool, has_address: bool) -> Self {
        if has_email && (has_phone || has_address) {
            Confidence::High
        } else if has_email || has_phone || has_address {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Final output of a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResult {
    /// Corrected company name.
    pub company_name: String,

    /// Country the result applies to.
    pub country: String,

    /// Official website, normalized, if one was selected.
    pub website: Option<String>,

    /// Contact page on the website's root domain, if one was found.
    pub contact_page: Option<String>,

    /// Verified emails, role-priority sorted, capped.
    pub emails: Vec<String>,

    /// Verified phones, digit-normalized, capped.
    pub phones: Vec<String>,

    /// Best address candidate as an opaque display string.
    pub address: Option<String>,

    /// Evidence trail: one entry per fetched page.
    pub sources: Vec<ContactSource>,

    /// Verification-based confidence grade.
    pub confidence: Confidence,

    /// Diagnostics: fallbacks taken, unverified values dropped, failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ContactResult {
    /// An empty low-confidence result for the given identity.
    pub fn empty(company_name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            country: country.into(),
            website: None,
            contact_page: None,
            emails: vec![],
            phones: vec![],
            address: None,
            sources: vec![],
            confidence: Confidence::Low,
            notes: None,
        }
    }

    /// Attach a diagnostic note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes = Some(note.into());
        self
    }
}

/// What the orchestrator returns: the result plus how many tool-loop
/// turns it took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScavengeReport {
    /// The sealed result. Well-formed even on total failure.
    pub result: ContactResult,

    /// Assistant turns consumed in the tool loop (the forced final call
    /// is not counted).
    pub turns_used: usize,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_input() {
        let query = ContactQuery::new("  Acme GmbH \n", " Germany ");
        assert_eq!(query.company_name, "Acme GmbH");
        assert_eq!(query.country_hint, "Germany");
        assert!(!query.is_empty());
        assert!(ContactQuery::new("   ", "Germany").is_empty());
    }

    #[test]
    fn test_identity_accepts_corrected_name_alias() {
        let identity: CorrectedIdentity =
            serde_json::from_str(r#"{"corrected_name": "Chalishkan Company", "country": "Iraq"}"#)
                .unwrap();
        assert_eq!(identity.company_name, "Chalishkan Company");
        assert_eq!(identity.country, "Iraq");
        assert!(identity.contact_keywords.is_empty());
    }

    #[test]
    fn test_fetch_result_failure_shape() {
        let result = PageFetchResult::failure(
            "https://example.com/",
            "HTTP status 404 from https://example.com/",
            Duration::from_millis(120),
        );

        assert_eq!(result.final_url, result.requested_url);
        assert!(result.error.is_some());
        assert!(!result.has_signals());
    }

    #[test]
    fn test_fetch_latency_serializes_as_millis() {
        let result = PageFetchResult::failure("https://example.com/", "nope", Duration::from_millis(1500));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["fetch_latency_ms"], 1500);

        let back: PageFetchResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.fetch_latency, Duration::from_millis(1500));
    }

    #[test]
    fn test_confidence_grading() {
        assert_eq!(Confidence::grade(true, true, false), Confidence::High);
        assert_eq!(Confidence::grade(true, false, true), Confidence::High);
        assert_eq!(Confidence::grade(true, false, false), Confidence::Medium);
        assert_eq!(Confidence::grade(false, true, false), Confidence::Medium);
        assert_eq!(Confidence::grade(false, false, true), Confidence::Medium);
        assert_eq!(Confidence::grade(false, false, false), Confidence::Low);
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Confidence::High).unwrap(),
            "\"high\""
        );
        assert_eq!(serde_json::to_string(&Confidence::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn test_source_kind_serializes_snake_case() {
        let source = ContactSource {
            kind: SourceKind::ContactPage,
            url: "https://example.com/contact".to_string(),
            emails_found: vec![],
            phones_found: vec![],
            address_snippet: None,
        };
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["type"], "contact_page");
    }
}
