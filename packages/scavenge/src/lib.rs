//! LLM-driven company contact discovery
//!
//! Give it a company name (possibly misspelled, possibly unromanized) and
//! a country hint; it runs a DeepSeek tool-calling loop over web search
//! and page fetching and returns verified contact details. The model
//! decides where to look; the pipeline decides what to trust.
//!
//! # Verification invariant
//!
//! Every email and phone on the final `ContactResult` was seen on a page
//! the pipeline actually fetched, and `sources` says which one. Values
//! the model picked up from search snippets alone are treated as leads
//! and never emitted directly.
//!
//! # Usage
//!
//! ```rust,ignore
//! use scavenge::{ContactFinder, ContactQuery, DiscoveryConfig};
//! use scavenge::{DuckDuckGoSearcher, ReqwestTransport};
//! use deepseek_client::DeepSeekClient;
//!
//! let config = DiscoveryConfig::default();
//! let finder = ContactFinder::new(
//!     DeepSeekClient::from_env()?,
//!     DuckDuckGoSearcher::new()?,
//!     ReqwestTransport::new(&config.fetch)?,
//!     config,
//! )
//! .on_progress(|msg| eprintln!("{msg}"));
//!
//! let report = finder.find(&ContactQuery::new("Chalshkn Co", "Iraq")).await;
//! println!("{}", serde_json::to_string_pretty(&report.result)?);
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`] - The conversation loop (`ContactFinder`)
//! - [`search`] - Search adapter: ranking, selection, eager fetches
//! - [`fetch`] - Cached, throttled, retrying page fetcher
//! - [`extract`] - Pure email/phone/address extraction and scoring
//! - [`traits`] - Infrastructure seams (chat, search, transport)
//! - [`config`] - Injected policies, all with defaults
//! - [`testing`] - Scripted fakes for the three seams

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod orchestrator;
pub mod search;
pub mod searcher;
pub mod testing;
pub mod traits;
pub mod transport;
pub mod types;

// Re-export core types at crate root
pub use config::{
    CachePolicy, DiscoveryConfig, ExtractPolicy, FetchPolicy, LocaleKeywords, RetryPolicy,
    SearchPolicy,
};
pub use error::{FetchError, FetchResult, Result, ScavengeError};
pub use fetch::{normalize_url, FetchCache, PageFetcher};
pub use orchestrator::{ContactFinder, ProgressFn};
pub use search::{FetchRecord, SearchAdapter, SearchReply};
pub use searcher::DuckDuckGoSearcher;
pub use traits::{ChatModel, HttpPage, PageTransport, WebSearcher};
pub use transport::ReqwestTransport;
pub use types::{
    Confidence, ContactQuery, ContactResult, ContactSource, CorrectedIdentity, PageFetchResult,
    ScavengeReport, SearchHit, SourceKind,
};
