//! Configuration for the contact-discovery pipeline.
//!
//! Every tunable (blocklists, keyword sets, contact paths, caps, budgets,
//! TTLs) is injected configuration with defaults, never module-level
//! globals, so tests can substitute alternate policies per component.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::CorrectedIdentity;

/// Top-level configuration for a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Model id sent on every chat call. Default: `deepseek-chat`.
    pub model: String,

    /// Maximum assistant turns in the tool loop before the forced final
    /// answer. Default: 12.
    pub turn_budget: usize,

    /// Search ranking and blocklist policy.
    #[serde(default)]
    pub search: SearchPolicy,

    /// HTTP fetch policy.
    #[serde(default)]
    pub fetch: FetchPolicy,

    /// Page cache policy.
    #[serde(default)]
    pub cache: CachePolicy,

    /// Retry policy for transient fetch failures.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Email/phone/address extraction policy.
    #[serde(default)]
    pub extract: ExtractPolicy,

    /// Built-in localized keyword sets, merged with the per-run corrected
    /// identity's keywords.
    #[serde(default)]
    pub keywords: LocaleKeywords,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            turn_budget: 12,
            search: SearchPolicy::default(),
            fetch: FetchPolicy::default(),
            cache: CachePolicy::default(),
            retry: RetryPolicy::default(),
            extract: ExtractPolicy::default(),
            keywords: LocaleKeywords::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chat model id.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the tool-loop turn budget.
    pub fn with_turn_budget(mut self, turns: usize) -> Self {
        self.turn_budget = turns;
        self
    }

    /// Replace the search policy.
    pub fn with_search(mut self, search: SearchPolicy) -> Self {
        self.search = search;
        self
    }

    /// Replace the fetch policy.
    pub fn with_fetch(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Replace the cache policy.
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the extraction policy.
    pub fn with_extract(mut self, extract: ExtractPolicy) -> Self {
        self.extract = extract;
        self
    }

    /// Replace the built-in keyword sets.
    pub fn with_keywords(mut self, keywords: LocaleKeywords) -> Self {
        self.keywords = keywords;
        self
    }
}

// ============================================================================
// Search
// ============================================================================

/// Ranking and domain policy for search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPolicy {
    /// Result count requested from the search provider. Default: 12.
    pub max_results: usize,

    /// Directory/aggregator/social domains that can never be selected as
    /// the official site and are never fetched. Matched as host suffixes,
    /// so subdomains are caught.
    pub blocklist: Vec<String>,

    /// Lowercase keywords marking a URL path or hit title as contact-ish
    /// when choosing a contact page among ranked hits.
    pub contact_url_keywords: Vec<String>,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            max_results: 12,
            blocklist: to_strings(&[
                "dnb.com",
                "yellowpages",
                "yelp.com",
                "linkedin.com",
                "facebook.com",
                "bloomberg.com",
                "zoominfo.com",
                "crunchbase.com",
                "glassdoor.com",
                "indeed.com",
                "scribd.com",
                "opencorporates.com",
                "kompass.com",
                "b2bhint.com",
                "volza.com",
                "bizorg.su",
                "panjiva.com",
                "importgenius.com",
                "zauba.com",
                "trademap.org",
                "europages.com",
                "alibaba.com",
                "made-in-china.com",
                "globalsources.com",
                "thomasnet.com",
                "manta.com",
                "hoovers.com",
                "spoke.com",
                "corporationwiki.com",
                "buzzfile.com",
                "owler.com",
                "datanyze.com",
                "apollo.io",
                "instagram.com",
                "twitter.com",
                "x.com",
                "youtube.com",
                "tiktok.com",
                "pinterest.com",
            ]),
            contact_url_keywords: to_strings(&[
                "contact",
                "contacts",
                "kontakt",
                "iletisim",
                "contacto",
                "about",
                "about-us",
                "impressum",
                "imprint",
                "legal",
            ]),
        }
    }
}

impl SearchPolicy {
    /// Whether a hostname falls under a blocklisted domain.
    ///
    /// Suffix match: `directory.example` blocks both `directory.example`
    /// and `sub.directory.example`. Entries without a dot (e.g.
    /// `yellowpages`) match as substrings, covering ccTLD variants like
    /// `yellowpages.com.au`.
    pub fn is_blocklisted_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        self.blocklist.iter().any(|entry| {
            if entry.contains('.') {
                host == entry || host.ends_with(&format!(".{entry}"))
            } else {
                host.contains(entry.as_str())
            }
        })
    }

    /// Whether a full URL's host is blocklisted. Unparseable URLs are not
    /// blocklisted (they fail later at normalization instead).
    pub fn is_blocklisted_url(&self, url: &str) -> bool {
        match crate::extract::scoring::host_of(url) {
            Some(host) => self.is_blocklisted_host(&host),
            None => false,
        }
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// HTTP policy for page fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Per-request timeout. Default: 20s.
    pub request_timeout: Duration,

    /// Simultaneous page fetches, process-wide per fetcher. Default: 5.
    pub concurrency: usize,

    /// User-Agent header sent on every fetch.
    pub user_agent: String,

    /// Well-known contact-page paths probed against the site root when no
    /// contact anchor pans out.
    pub contact_paths: Vec<String>,

    /// Contact-ish anchors tried during discovery. Default: 3.
    pub max_contact_anchor_tries: usize,

    /// Minimum body length for an anchor candidate to be adopted as the
    /// contact page. Default: 300.
    pub min_anchor_body: usize,

    /// Minimum body length for a probed well-known path to be adopted.
    /// Default: 500.
    pub min_probe_body: usize,

    /// Visible-text preview cap in characters. Default: 2500.
    pub text_preview_chars: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            concurrency: 5,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            contact_paths: to_strings(&[
                "/contact",
                "/contact-us",
                "/contacts",
                "/en/contact",
                "/en/contact-us",
                "/iletisim",
                "/tr/iletisim",
                "/kontakt",
                "/de/kontakt",
                "/contacto",
                "/es/contacto",
                "/about/contact",
                "/about-us/contact",
            ]),
            max_contact_anchor_tries: 3,
            min_anchor_body: 300,
            min_probe_body: 500,
            text_preview_chars: 2500,
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Policy for the in-process page cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    /// How long an entry stays servable. Default: 15 minutes.
    pub ttl: Duration,

    /// Entry cap; the oldest-inserted entry is evicted when full.
    /// Default: 256.
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            max_entries: 256,
        }
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Bounded exponential backoff for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Default: 3.
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles per attempt.
    /// Default: 500ms.
    pub base_delay: Duration,

    /// Upper bound on any single delay. Default: 8s.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the given 1-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Filtering and capping rules for extracted contact signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractPolicy {
    /// Lowercase fragments that disqualify an email (placeholders, CMS
    /// artifacts, image filenames, no-reply addresses).
    pub junk_email_fragments: Vec<String>,

    /// Local-part prefixes sorted to the front of the email list, in
    /// order of preference.
    pub role_priority: Vec<String>,

    /// Lowercase markers anchoring address text-window extraction.
    /// Per-run localized address keywords are appended to these.
    pub address_markers: Vec<String>,

    /// Email list cap. Default: 10.
    pub max_emails: usize,

    /// Phone list cap. Default: 10.
    pub max_phones: usize,

    /// Address candidate cap. Default: 5.
    pub max_addresses: usize,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            junk_email_fragments: to_strings(&[
                "example",
                "test",
                "sample",
                "your@",
                "domain",
                "wix",
                "wordpress",
                "sentry",
                "schema",
                "noreply",
                "no-reply",
                ".png",
                ".jpg",
                ".gif",
            ]),
            role_priority: to_strings(&["info", "sales", "export", "contact", "support"]),
            address_markers: to_strings(&[
                "address",
                "location",
                "hq",
                "office",
                "box ",
                "street",
                "road",
                "avenue",
                "suite",
                "floor",
            ]),
            max_emails: 10,
            max_phones: 10,
            max_addresses: 5,
        }
    }
}

// ============================================================================
// Localized keywords
// ============================================================================

/// Words meaning "contact" and "address" in languages the pipeline may
/// encounter. The name-correction step supplies additional per-company
/// localizations which are merged in for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleKeywords {
    /// Contact-page keywords, matched against URLs, anchor text, and hit
    /// titles.
    pub contact: Vec<String>,

    /// Address keywords, used as extra markers for address-window
    /// extraction.
    pub address: Vec<String>,
}

impl Default for LocaleKeywords {
    fn default() -> Self {
        Self {
            contact: to_strings(&["Contact", "İletişim", "iletisim", "Kontakt", "Contacto"]),
            address: to_strings(&["Address", "Adres", "Adresse"]),
        }
    }
}

impl LocaleKeywords {
    /// The built-in sets extended with the corrected identity's localized
    /// keywords, deduplicated case-insensitively.
    pub fn merged_with(&self, identity: &CorrectedIdentity) -> LocaleKeywords {
        let mut merged = self.clone();
        merged
            .contact
            .extend(identity.contact_keywords.iter().cloned());
        merged
            .address
            .extend(identity.address_keywords.iter().cloned());
        merged.contact = dedup_case_insensitive(merged.contact);
        merged.address = dedup_case_insensitive(merged.address);
        merged
    }

    /// Contact keywords, lowercased for matching.
    pub fn contact_lowercase(&self) -> Vec<String> {
        self.contact.iter().map(|k| k.to_lowercase()).collect()
    }

    /// Address keywords, lowercased for matching.
    pub fn address_lowercase(&self) -> Vec<String> {
        self.address.iter().map(|k| k.to_lowercase()).collect()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = item.to_lowercase();
            !item.trim().is_empty() && seen.insert(key)
        })
        .collect()
}
