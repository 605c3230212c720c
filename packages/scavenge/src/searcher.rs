//! DuckDuckGo search provider.
//!
//! Scrapes the plain-HTML endpoint (`html.duckduckgo.com/html/`), which
//! serves static markup and needs no API key. Result anchors point at a
//! redirect URL carrying the real destination in the `uddg` query
//! parameter; `parse_results` unwraps it.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::{Result, ScavengeError};
use crate::traits::WebSearcher;
use crate::types::SearchHit;

/// Plain-HTML search endpoint.
const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Browser-like User-Agent; the endpoint rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     Chrome/120.0.0.0 Safari/537.36";

/// Web search over DuckDuckGo's HTML endpoint.
pub struct DuckDuckGoSearcher {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearcher {
    /// Create a new searcher.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScavengeError::Search(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: HTML_ENDPOINT.to_string(),
        })
    }

    /// Point at a different endpoint (tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Parse result blocks out of the endpoint's HTML.
    fn parse_results(body: &str, max_results: usize) -> Vec<SearchHit> {
        let document = Html::parse_document(body);

        let result_selector = match Selector::parse("div.result") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let title_selector = match Selector::parse("a.result__a") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let snippet_selector = match Selector::parse(".result__snippet") {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let mut hits = Vec::new();
        for block in document.select(&result_selector) {
            if hits.len() >= max_results {
                break;
            }

            // Sponsored blocks carry a result--ad class
            if block.value().classes().any(|c| c.contains("result--ad")) {
                continue;
            }

            let Some(anchor) = block.select(&title_selector).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = Self::unwrap_redirect(href) else {
                continue;
            };

            let title = anchor.text().collect::<String>().trim().to_string();
            let snippet = block
                .select(&snippet_selector)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            hits.push(SearchHit::new(title, snippet, url));
        }
        hits
    }

    /// Resolve a result href to the destination URL.
    ///
    /// Hrefs are usually scheme-relative redirects of the form
    /// `//duckduckgo.com/l/?uddg=<encoded>&rut=...`; direct http(s) links
    /// pass through unchanged. Anything else (ad intermediaries, relative
    /// paths) is dropped.
    fn unwrap_redirect(href: &str) -> Option<String> {
        let absolute = if let Some(rest) = href.strip_prefix("//") {
            format!("https://{}", rest)
        } else {
            href.to_string()
        };

        let parsed = Url::parse(&absolute).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }

        let host = parsed.host_str().unwrap_or_default();
        if host.ends_with("duckduckgo.com") {
            // Redirect wrapper: the destination rides in `uddg`
            let target = parsed
                .query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())?;
            if target.starts_with("http://") || target.starts_with("https://") {
                return Some(target);
            }
            return None;
        }

        Some(absolute)
    }
}

#[async_trait]
impl WebSearcher for DuckDuckGoSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ScavengeError::Search(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScavengeError::Search(
                format!("DuckDuckGo HTML endpoint returned {}", status).into(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScavengeError::Search(Box::new(e)))?;

        let hits = Self::parse_results(&body, max_results);
        debug!(query = %query, hits = hits.len(), "DuckDuckGo search");
        Ok(hits)
    }
}
