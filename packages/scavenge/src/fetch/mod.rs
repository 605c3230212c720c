//! Page fetcher: cached, throttled, retrying page retrieval with
//! contact-page discovery.
//!
//! `fetch` never returns `Err`. Failures become error-bearing
//! `PageFetchResult`s and are cached like successes, so the model can
//! keep working with whatever the run has found so far.

mod cache;

pub use cache::FetchCache;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::config::{DiscoveryConfig, ExtractPolicy, FetchPolicy, LocaleKeywords, RetryPolicy};
use crate::error::{FetchError, FetchResult};
use crate::extract::html::contact_link_candidates;
use crate::extract::{collect_addresses, collect_phones, filter_emails, harvest_signals};
use crate::traits::{HttpPage, PageTransport};
use crate::types::PageFetchResult;

/// Normalize a URL for fetching and cache keying.
///
/// Adds `https://` when no scheme is present, lowercases the host,
/// strips a leading `www.` and any fragment. Idempotent; only http(s)
/// URLs with a host pass.
pub fn normalize_url(raw: &str) -> FetchResult<String> {
    let invalid = || FetchError::InvalidUrl {
        url: raw.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let mut url = Url::parse(&with_scheme).map_err(|_| invalid())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host)).map_err(|_| invalid())?;
    url.set_fragment(None);

    Ok(url.to_string())
}

/// Whether the URL already looks like a contact page.
fn url_matches_contact(url: &str, contact_keywords_lower: &[String]) -> bool {
    let lower = url.to_lowercase();
    contact_keywords_lower.iter().any(|k| lower.contains(k))
}

/// Cached, throttled, retrying page fetcher over a transport seam.
///
/// Cheap to clone; clones share the cache and the permit pool.
pub struct PageFetcher<T: PageTransport> {
    transport: Arc<T>,
    cache: Arc<FetchCache>,
    permits: Arc<Semaphore>,
    fetch: FetchPolicy,
    retry: RetryPolicy,
    extract: ExtractPolicy,
}

impl<T: PageTransport> Clone for PageFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(&self.cache),
            permits: Arc::clone(&self.permits),
            fetch: self.fetch.clone(),
            retry: self.retry.clone(),
            extract: self.extract.clone(),
        }
    }
}

impl<T: PageTransport> PageFetcher<T> {
    pub fn new(transport: Arc<T>, config: &DiscoveryConfig) -> Self {
        Self {
            transport,
            cache: Arc::new(FetchCache::new(config.cache.clone())),
            permits: Arc::new(Semaphore::new(config.fetch.concurrency.max(1))),
            fetch: config.fetch.clone(),
            retry: config.retry.clone(),
            extract: config.extract.clone(),
        }
    }

    /// Shared cache handle.
    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Fetch a page and extract its contact signals.
    ///
    /// Pipeline: normalize, cache lookup, permit, retrying GET,
    /// contact-page discovery, signal extraction, cache insert.
    pub async fn fetch(&self, url: &str, keywords: &LocaleKeywords) -> PageFetchResult {
        let started = Instant::now();

        // Invalid URLs are rejected outright and never cached.
        let normalized = match normalize_url(url) {
            Ok(n) => n,
            Err(e) => {
                debug!(url = %url, "rejected invalid URL");
                return PageFetchResult::failure(url, e, started.elapsed());
            }
        };

        if let Some(cached) = self.cache.get(&normalized) {
            debug!(url = %normalized, "fetch served from cache");
            return cached;
        }

        let _permit = self.permits.acquire().await.unwrap();

        let page = match self.get_with_retry(&normalized).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %normalized, error = %e, "fetch failed");
                let result = PageFetchResult::failure(&normalized, &e, started.elapsed());
                self.cache.insert(normalized, result.clone());
                return result;
            }
        };

        let address_markers = self.address_markers(keywords);
        let contact_lower = keywords.contact_lowercase();

        let mut signals = harvest_signals(&page.body, &address_markers);
        let mut final_url = page.final_url.clone();

        // Hop to the site's contact page unless we are already on one.
        if !url_matches_contact(&final_url, &contact_lower) {
            if let Some(adopted) = self.discover_contact_page(&page, &contact_lower).await {
                debug!(from = %final_url, to = %adopted.final_url, "adopted contact page");
                signals.absorb(harvest_signals(&adopted.body, &address_markers));
                final_url = adopted.final_url;
            }
        }

        let emails = filter_emails(signals.emails, &self.extract);
        let phones = collect_phones(signals.phones, &self.extract);
        let address_candidates = collect_addresses(signals.addresses, &self.extract);
        let text_preview: String = signals
            .text
            .chars()
            .take(self.fetch.text_preview_chars)
            .collect();

        let result = PageFetchResult {
            requested_url: normalized.clone(),
            final_url,
            emails,
            phones,
            address_candidates,
            text_preview,
            fetch_latency: started.elapsed(),
            error: None,
        };
        self.cache.insert(normalized, result.clone());
        result
    }

    /// GET with bounded retries on transient failures.
    async fn get_with_retry(&self, url: &str) -> FetchResult<HttpPage> {
        let mut attempt = 1u32;
        loop {
            let failure = match self.transport.get(url).await {
                Ok(page) if page.is_success() => return Ok(page),
                Ok(page) => FetchError::Status {
                    status: page.status,
                    url: url.to_string(),
                },
                Err(e) => e,
            };

            if attempt >= self.retry.max_attempts || !failure.is_retryable() {
                return Err(failure);
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                url = %url,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying fetch"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Try to locate the site's contact page from the landing page.
    ///
    /// Contact-looking anchors first (bounded by policy), then the
    /// well-known paths against the site root. Probes are single-attempt
    /// GETs issued under the permit the caller already holds.
    async fn discover_contact_page(
        &self,
        landing: &HttpPage,
        contact_lower: &[String],
    ) -> Option<HttpPage> {
        let base = Url::parse(&landing.final_url).ok()?;

        let anchors = contact_link_candidates(&landing.body, &base, contact_lower);
        for candidate in anchors
            .into_iter()
            .take(self.fetch.max_contact_anchor_tries)
        {
            match self.transport.get(&candidate).await {
                Ok(page) if page.is_success() && page.body.len() > self.fetch.min_anchor_body => {
                    return Some(page);
                }
                Ok(_) => {}
                Err(e) => debug!(url = %candidate, error = %e, "contact anchor probe failed"),
            }
        }

        // No anchor panned out; probe the well-known paths.
        for path in &self.fetch.contact_paths {
            let Ok(probe) = base.join(path) else { continue };
            let probe = probe.to_string();
            match self.transport.get(&probe).await {
                Ok(page) if page.is_success() && page.body.len() > self.fetch.min_probe_body => {
                    return Some(page);
                }
                Ok(_) => {}
                Err(e) => debug!(url = %probe, error = %e, "contact path probe failed"),
            }
        }

        None
    }

    fn address_markers(&self, keywords: &LocaleKeywords) -> Vec<String> {
        let mut markers = self.extract.address_markers.clone();
        markers.extend(keywords.address_lowercase());
        markers
    }
}
