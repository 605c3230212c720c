//! Search adapter: one `web_search` tool call end to end.
//!
//! Ranks provider hits, picks the official website and a likely contact
//! page, fetches both eagerly, and folds everything into a single JSON
//! reply the model can read in one turn. Provider failures degrade to a
//! reply payload; `run_search` never returns `Err`.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{ExtractPolicy, LocaleKeywords, SearchPolicy};
use crate::extract::{
    collect_addresses, collect_phones, company_tokens, filter_emails, find_emails, find_phones,
    rank_hits, same_root_domain,
};
use crate::fetch::PageFetcher;
use crate::traits::{PageTransport, WebSearcher};
use crate::types::{CorrectedIdentity, PageFetchResult, SearchHit, SourceKind};

/// Standing instruction appended to every search summary.
const INSTRUCTION: &str = "Use only verified_emails and verified_phones in your final \
    answer; snippet_emails and snippet_phones are unconfirmed leads. Look for the \
    street address in page_preview and address_candidates. If no_official_site is \
    true, try a different search query.";

/// One eager fetch performed while serving a search, tagged with how
/// the page entered the run.
#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub kind: SourceKind,
    pub result: PageFetchResult,
}

/// Everything one `web_search` call produced: the JSON reply for the
/// model and the fetches the orchestrator should log as sources.
#[derive(Debug, Clone)]
pub struct SearchReply {
    pub reply: Value,
    pub fetches: Vec<FetchRecord>,
}

/// Borrows the run's searcher and fetcher for the duration of one tool
/// call. The orchestrator constructs one per dispatch.
pub struct SearchAdapter<'a, S: WebSearcher, T: PageTransport> {
    searcher: &'a S,
    fetcher: &'a PageFetcher<T>,
    policy: &'a SearchPolicy,
    extract: &'a ExtractPolicy,
}

impl<'a, S: WebSearcher, T: PageTransport> SearchAdapter<'a, S, T> {
    pub fn new(
        searcher: &'a S,
        fetcher: &'a PageFetcher<T>,
        policy: &'a SearchPolicy,
        extract: &'a ExtractPolicy,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            policy,
            extract,
        }
    }

    /// Run one search for the model.
    ///
    /// The reply is always an array: a summary object first, then the
    /// ranked hits as `{title, snippet, url}`. Verified values come only
    /// from pages actually fetched this call; snippet values are regex
    /// matches over provider text and are labeled as leads.
    pub async fn run_search(
        &self,
        query: &str,
        identity: &CorrectedIdentity,
        keywords: &LocaleKeywords,
    ) -> SearchReply {
        let hits = match self.searcher.search(query, self.policy.max_results).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(query = %query, error = %err, "search provider failed");
                return SearchReply {
                    reply: json!([{
                        "search_failed": true,
                        "error": err.to_string(),
                        "instruction": "The search provider failed. Try again with a different query.",
                    }]),
                    fetches: vec![],
                };
            }
        };

        if hits.is_empty() {
            return SearchReply {
                reply: json!([{ "error": "No search results found." }]),
                fetches: vec![],
            };
        }

        let tokens = company_tokens(&identity.company_name);
        let ranked = rank_hits(hits, &tokens, &identity.country, self.policy);
        debug!(query = %query, hits = ranked.len(), "ranked search hits");

        let website = select_website(&ranked);
        let contact_page = select_contact_page(&ranked, website, self.policy, keywords);

        let website_fetch = async {
            match website {
                Some(hit) => Some(self.fetcher.fetch(&hit.url, keywords).await),
                None => None,
            }
        };
        let contact_fetch = async {
            match contact_page {
                Some(hit) => Some(self.fetcher.fetch(&hit.url, keywords).await),
                None => None,
            }
        };
        let (website_fetch, contact_fetch) = tokio::join!(website_fetch, contact_fetch);

        // Discovery page preview over landing page preview.
        let page_preview = contact_fetch
            .as_ref()
            .map(|fetch| fetch.text_preview.clone())
            .filter(|preview| !preview.is_empty())
            .or_else(|| website_fetch.as_ref().map(|fetch| fetch.text_preview.clone()))
            .unwrap_or_default();

        let mut page_emails = Vec::new();
        let mut page_phones = Vec::new();
        let mut page_addresses = Vec::new();
        for fetch in [&website_fetch, &contact_fetch].into_iter().flatten() {
            page_emails.extend(fetch.emails.iter().cloned());
            page_phones.extend(fetch.phones.iter().cloned());
            page_addresses.extend(fetch.address_candidates.iter().cloned());
        }
        let verified_emails = filter_emails(page_emails, self.extract);
        let verified_phones = collect_phones(page_phones, self.extract);
        let address_candidates = collect_addresses(page_addresses, self.extract);

        let mut snippet_email_matches = Vec::new();
        let mut snippet_phone_matches = Vec::new();
        for hit in &ranked {
            snippet_email_matches.extend(find_emails(&hit.title));
            snippet_email_matches.extend(find_emails(&hit.snippet));
            snippet_phone_matches.extend(find_phones(&hit.title));
            snippet_phone_matches.extend(find_phones(&hit.snippet));
        }
        let snippet_emails = filter_emails(snippet_email_matches, self.extract);
        let snippet_phones = collect_phones(snippet_phone_matches, self.extract);

        let contact_info_found = !verified_emails.is_empty() || !verified_phones.is_empty();
        let summary = json!({
            "contact_info_found": contact_info_found,
            "website": website.map(|hit| hit.url.clone()),
            "contact_page": contact_page.map(|hit| hit.url.clone()),
            "snippet_emails": snippet_emails,
            "snippet_phones": snippet_phones,
            "verified_emails": verified_emails,
            "verified_phones": verified_phones,
            "address_candidates": address_candidates,
            "page_preview": page_preview,
            "no_official_site": website.is_none(),
            "instruction": INSTRUCTION,
        });

        let mut reply = vec![summary];
        for hit in &ranked {
            reply.push(json!({
                "title": hit.title,
                "snippet": hit.snippet,
                "url": hit.url,
            }));
        }

        let mut fetches = Vec::new();
        if let Some(result) = website_fetch {
            fetches.push(FetchRecord {
                kind: SourceKind::Website,
                result,
            });
        }
        if let Some(result) = contact_fetch {
            fetches.push(FetchRecord {
                kind: SourceKind::ContactPage,
                result,
            });
        }

        SearchReply {
            reply: Value::Array(reply),
            fetches,
        }
    }
}

/// The official website: the best-ranked hit that is not blocklisted.
/// Ranking already sorts blocklisted hits last and scores descending,
/// so the first clean hit is the top-scored one.
fn select_website(ranked: &[SearchHit]) -> Option<&SearchHit> {
    ranked.iter().find(|hit| !hit.blocklisted)
}

/// A contact page on the website's root domain: URL path or title must
/// carry a contact keyword, and the hit must not be the website itself.
fn select_contact_page<'h>(
    ranked: &'h [SearchHit],
    website: Option<&SearchHit>,
    policy: &SearchPolicy,
    keywords: &LocaleKeywords,
) -> Option<&'h SearchHit> {
    let website = website?;
    let mut wanted: Vec<String> = policy
        .contact_url_keywords
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .collect();
    wanted.extend(keywords.contact_lowercase());

    ranked.iter().find(|hit| {
        if hit.blocklisted || hit.url == website.url {
            return false;
        }
        if !same_root_domain(&hit.url, &website.url) {
            return false;
        }
        let url = hit.url.to_lowercase();
        let title = hit.title.to_lowercase();
        wanted
            .iter()
            .any(|keyword| url.contains(keyword) || title.contains(keyword))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::DiscoveryConfig;
    use crate::testing::{MockTransport, MockWebSearcher};

    fn identity(name: &str, country: &str) -> CorrectedIdentity {
        CorrectedIdentity {
            company_name: name.to_string(),
            country: country.to_string(),
            language_code: String::new(),
            contact_keywords: vec![],
            address_keywords: vec![],
        }
    }

    fn fetcher(transport: MockTransport, config: &DiscoveryConfig) -> PageFetcher<MockTransport> {
        PageFetcher::new(Arc::new(transport), config)
    }

    #[tokio::test]
    async fn test_run_search_selects_and_fetches_website() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default().with_hits(
            "acme pumps iraq",
            vec![
                SearchHit::new(
                    "Acme Pumps | D&B Business Directory",
                    "Acme Pumps profile",
                    "https://www.dnb.com/business-directory/acmepumps.html",
                ),
                SearchHit::new(
                    "Acme Pumps - Official Site",
                    "Industrial pumps from Acme",
                    "https://acmepumps.com/",
                ),
            ],
        );
        let transport = MockTransport::default().with_page(
            "https://acmepumps.com/",
            "<html><body><p>Reach us at sales@acmepumps.com</p></body></html>",
        );
        let log = transport.clone();
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search(
                "acme pumps iraq",
                &identity("Acme Pumps", "Iraq"),
                &config.keywords,
            )
            .await;

        let summary = &reply.reply[0];
        assert_eq!(summary["website"], "https://acmepumps.com/");
        assert_eq!(summary["no_official_site"], false);
        assert_eq!(summary["contact_info_found"], true);
        assert_eq!(summary["verified_emails"][0], "sales@acmepumps.com");

        // The directory hit stays in the list but is never fetched.
        // Contact-path probes hit the official domain only.
        assert_eq!(log.calls_for("https://acmepumps.com/"), 1);
        assert!(log.calls().iter().all(|url| !url.contains("dnb.com")));
        assert_eq!(reply.fetches.len(), 1);
        assert_eq!(reply.fetches[0].kind, SourceKind::Website);
    }

    #[tokio::test]
    async fn test_run_search_all_blocklisted_fetches_nothing() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default().with_hits(
            "acme pumps",
            vec![
                SearchHit::new(
                    "Acme Pumps | LinkedIn",
                    "Acme Pumps on LinkedIn",
                    "https://www.linkedin.com/company/acmepumps",
                ),
                SearchHit::new(
                    "Acme Pumps | D&B",
                    "company profile",
                    "https://www.dnb.com/acmepumps.html",
                ),
            ],
        );
        let transport = MockTransport::default();
        let log = transport.clone();
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search("acme pumps", &identity("Acme Pumps", "Iraq"), &config.keywords)
            .await;

        let summary = &reply.reply[0];
        assert_eq!(summary["no_official_site"], true);
        assert_eq!(summary["website"], Value::Null);
        assert_eq!(summary["contact_info_found"], false);
        assert_eq!(log.call_count(), 0);
        assert!(reply.fetches.is_empty());
    }

    #[tokio::test]
    async fn test_run_search_selects_contact_page_on_same_domain() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default().with_hits(
            "acme pumps contact",
            vec![
                SearchHit::new(
                    "Acme Pumps - Official Site",
                    "Industrial pumps from Acme Pumps in Iraq",
                    "https://acmepumps.com/",
                ),
                SearchHit::new(
                    "Contact Us - Acme Pumps",
                    "Get in touch with Acme Pumps",
                    "https://acmepumps.com/contact",
                ),
                SearchHit::new(
                    "Contact | Other Corp",
                    "Contact page on an unrelated domain",
                    "https://othercorp.com/contact",
                ),
            ],
        );
        let transport = MockTransport::default()
            .with_page("https://acmepumps.com/", "<html><body>Home</body></html>")
            .with_page(
                "https://acmepumps.com/contact",
                "<html><body><p>Phone: +964 751 455 4426, sales@acmepumps.com. \
                 Visit our office in Erbil.</p></body></html>",
            );
        let log = transport.clone();
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search(
                "acme pumps contact",
                &identity("Acme Pumps", "Iraq"),
                &config.keywords,
            )
            .await;

        let summary = &reply.reply[0];
        assert_eq!(summary["website"], "https://acmepumps.com/");
        assert_eq!(summary["contact_page"], "https://acmepumps.com/contact");
        assert_eq!(summary["verified_phones"][0], "+9647514554426");
        // Contact-page text wins the preview.
        assert!(summary["page_preview"]
            .as_str()
            .is_some_and(|preview| preview.contains("Erbil")));
        assert_eq!(log.calls_for("https://othercorp.com/contact"), 0);
        assert_eq!(reply.fetches.len(), 2);
        assert_eq!(reply.fetches[1].kind, SourceKind::ContactPage);
    }

    #[tokio::test]
    async fn test_run_search_provider_failure_degrades_to_payload() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default().fail_query("acme pumps");
        let transport = MockTransport::default();
        let log = transport.clone();
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search("acme pumps", &identity("Acme Pumps", "Iraq"), &config.keywords)
            .await;

        assert_eq!(reply.reply[0]["search_failed"], true);
        assert!(reply.fetches.is_empty());
        assert_eq!(log.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_search_empty_results_payload() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default();
        let transport = MockTransport::default();
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search("acme pumps", &identity("Acme Pumps", "Iraq"), &config.keywords)
            .await;

        assert_eq!(reply.reply[0]["error"], "No search results found.");
        assert!(reply.fetches.is_empty());
    }

    #[tokio::test]
    async fn test_run_search_separates_snippet_and_verified_values() {
        let config = DiscoveryConfig::default();
        let searcher = MockWebSearcher::default().with_hits(
            "acme pumps",
            vec![SearchHit::new(
                "Acme Pumps - Official Site",
                "Email info@acmepumps.com for quotes",
                "https://acmepumps.com/",
            )],
        );
        // The fetched page carries a different address than the snippet.
        let transport = MockTransport::default().with_page(
            "https://acmepumps.com/",
            "<html><body><p>sales@acmepumps.com</p></body></html>",
        );
        let fetcher = fetcher(transport, &config);
        let adapter = SearchAdapter::new(&searcher, &fetcher, &config.search, &config.extract);

        let reply = adapter
            .run_search("acme pumps", &identity("Acme Pumps", "Iraq"), &config.keywords)
            .await;

        let summary = &reply.reply[0];
        assert_eq!(summary["snippet_emails"][0], "info@acmepumps.com");
        assert_eq!(summary["verified_emails"][0], "sales@acmepumps.com");
        let verified = summary["verified_emails"].as_array().unwrap();
        assert!(!verified.iter().any(|v| v == "info@acmepumps.com"));

        // Ranked hits follow the summary object.
        let hits = reply.reply.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1]["url"], "https://acmepumps.com/");
    }
}
