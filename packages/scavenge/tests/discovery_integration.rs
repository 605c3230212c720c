//! Integration tests for the full discovery pipeline.
//!
//! These tests wire `ContactFinder` to scripted chat, search, and
//! transport fakes and verify the end-to-end contracts:
//! 1. A misspelled name is corrected, searched, fetched, and sealed
//! 2. Verified-only sealing drops values no fetch ever saw
//! 3. Blocklisted domains are never fetched, not even on direct request
//! 4. The turn budget forces a final toolless answer

use std::sync::{Arc, Mutex};

use serde_json::json;

use scavenge::testing::{ChatModelCall, MockChatModel, MockTransport, MockWebSearcher};
use scavenge::{
    Confidence, ContactFinder, ContactQuery, DiscoveryConfig, SearchHit, SourceKind,
};

fn finder(
    chat: MockChatModel,
    searcher: MockWebSearcher,
    transport: MockTransport,
) -> ContactFinder<MockChatModel, MockWebSearcher, MockTransport> {
    ContactFinder::new(chat, searcher, transport, DiscoveryConfig::default())
}

#[tokio::test]
async fn test_misspelled_company_resolves_to_verified_contacts() {
    let query = "Chalishkan Company Iraq contact";
    let chat = MockChatModel::new()
        .with_json(r#"{"corrected_name": "Chalishkan Company", "country": "Iraq"}"#)
        .with_tool_call("web_search", json!({ "query": query }))
        .with_final_content(
            r#"{
                "email": ["info@chalishkan.com"],
                "phone": ["+964 751 455 4426"],
                "website": ["https://chalishkan.com"],
                "address": [],
                "company_name_english": "Chalishkan Company",
                "country_english": "Iraq",
                "country_code": "IQ"
            }"#,
        );
    let searcher = MockWebSearcher::new().with_hits(
        query,
        vec![
            SearchHit::new(
                "Chalishkan Company | D&B Business Directory",
                "Company profile for Chalishkan Company",
                "https://www.dnb.com/business-directory/chalishkan.html",
            ),
            SearchHit::new(
                "Chalishkan Company - Official Website",
                "Chalishkan Company, trading and logistics in Iraq",
                "https://chalishkan.com/",
            ),
        ],
    );
    let transport = MockTransport::new().with_page(
        "https://chalishkan.com/",
        "<html><body><p>Chalishkan Company, Erbil.</p>\
         <p>Email: info@chalishkan.com</p>\
         <p>Phone: +964 751 455 4426</p></body></html>",
    );

    let searcher_log = searcher.clone();
    let transport_log = transport.clone();
    let progress: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let progress_log = Arc::clone(&progress);
    let finder = finder(chat, searcher, transport)
        .on_progress(move |msg| progress_log.lock().unwrap().push(msg.to_string()));

    let report = finder.find(&ContactQuery::new("Chalshkn Co", "Iraq")).await;

    // Sealed result keeps the on-page values, normalized.
    assert_eq!(report.result.emails, vec!["info@chalishkan.com".to_string()]);
    assert_eq!(report.result.phones, vec!["+9647514554426".to_string()]);
    assert_eq!(report.result.website.as_deref(), Some("https://chalishkan.com/"));
    assert_eq!(report.result.company_name, "Chalishkan Company");
    assert_eq!(report.result.country, "Iraq");
    assert_ne!(report.result.confidence, Confidence::Low);
    assert_eq!(report.turns_used, 2);

    // Evidence trail references the fetched page.
    let source = report
        .result
        .sources
        .iter()
        .find(|s| s.url == "https://chalishkan.com/")
        .expect("website source recorded");
    assert_eq!(source.kind, SourceKind::Website);
    assert!(source.emails_found.contains(&"info@chalishkan.com".to_string()));

    // The directory hit ranked below the official site and was never
    // fetched.
    assert_eq!(searcher_log.queries(), vec![query.to_string()]);
    assert!(transport_log
        .calls()
        .iter()
        .all(|url| !url.contains("dnb.com")));

    let progress = progress.lock().unwrap();
    assert!(progress.iter().any(|msg| msg.contains("Corrected name")));
    assert!(progress.iter().any(|msg| msg.contains("searching")));
}

#[tokio::test]
async fn test_empty_company_name_makes_no_network_calls() {
    let chat = MockChatModel::new();
    let searcher = MockWebSearcher::new();
    let transport = MockTransport::new();
    let chat_log = chat.clone();
    let searcher_log = searcher.clone();
    let transport_log = transport.clone();
    let finder = finder(chat, searcher, transport);

    let report = finder.find(&ContactQuery::new("", "Iraq")).await;

    assert_eq!(report.turns_used, 0);
    assert_eq!(report.result.confidence, Confidence::Low);
    assert!(report.result.emails.is_empty());
    assert!(report.result.phones.is_empty());
    assert!(report.result.notes.is_some());
    assert_eq!(chat_log.call_count(), 0);
    assert!(searcher_log.queries().is_empty());
    assert_eq!(transport_log.call_count(), 0);
}

#[tokio::test]
async fn test_direct_fetch_seals_only_on_page_values() {
    let chat = MockChatModel::new()
        .with_json(r#"{"corrected_name": "Acme Pumps", "country": "Iraq"}"#)
        .with_tool_call("fetch_page", json!({ "url": "https://acmepumps.com/contact" }))
        .with_final_content(
            r#"{"email": ["fake@acmepumps.com", "info@acmepumps.com"], "phone": []}"#,
        );
    let transport = MockTransport::new().with_page(
        "https://acmepumps.com/contact",
        "<html><body><p>Write to info@acmepumps.com</p></body></html>",
    );
    let finder = finder(chat, MockWebSearcher::new(), transport);

    let report = finder.find(&ContactQuery::new("Acme Pumps", "Iraq")).await;

    // The invented address is dropped; only the on-page one survives.
    assert_eq!(report.result.emails, vec!["info@acmepumps.com".to_string()]);
    assert!(report
        .result
        .notes
        .as_deref()
        .unwrap_or("")
        .contains("dropped 1 unverified email"));
    assert_eq!(report.result.confidence, Confidence::Medium);

    let source = &report.result.sources[0];
    assert_eq!(source.kind, SourceKind::Page);
    assert_eq!(source.url, "https://acmepumps.com/contact");
}

#[tokio::test]
async fn test_blocklisted_direct_fetch_is_refused() {
    let chat = MockChatModel::new()
        .with_json(r#"{"corrected_name": "Acme Pumps", "country": "Iraq"}"#)
        .with_tool_call(
            "fetch_page",
            json!({ "url": "https://www.linkedin.com/company/acmepumps" }),
        )
        .with_final_content(r#"{"email": []}"#);
    let transport = MockTransport::new();
    let transport_log = transport.clone();
    let finder = finder(chat, MockWebSearcher::new(), transport);

    let report = finder.find(&ContactQuery::new("Acme Pumps", "Iraq")).await;

    assert_eq!(transport_log.call_count(), 0);
    assert!(report.result.sources.is_empty());
    assert_eq!(report.result.confidence, Confidence::Low);
}

#[tokio::test]
async fn test_all_blocklisted_results_fetch_nothing() {
    let query = "acme pumps iraq";
    let chat = MockChatModel::new()
        .with_json(r#"{"corrected_name": "Acme Pumps", "country": "Iraq"}"#)
        .with_tool_call("web_search", json!({ "query": query }))
        .with_final_content(r#"{"email": [], "phone": []}"#);
    let searcher = MockWebSearcher::new().with_hits(
        query,
        vec![
            SearchHit::new(
                "Acme Pumps | LinkedIn",
                "Acme Pumps on LinkedIn",
                "https://www.linkedin.com/company/acmepumps",
            ),
            SearchHit::new(
                "Acme Pumps - Yellow Pages",
                "Listings for Acme Pumps",
                "https://www.yellowpages.com/acmepumps",
            ),
        ],
    );
    let transport = MockTransport::new();
    let transport_log = transport.clone();
    let finder = finder(chat, searcher, transport);

    let report = finder.find(&ContactQuery::new("Acme Pumps", "Iraq")).await;

    assert_eq!(transport_log.call_count(), 0);
    assert!(report.result.sources.is_empty());
    assert!(report.result.website.is_none());
}

#[tokio::test]
async fn test_turn_budget_forces_final_toolless_answer() {
    let chat = MockChatModel::new()
        .with_json(r#"{"corrected_name": "Acme Pumps", "country": "Iraq"}"#)
        .with_tool_call("web_search", json!({ "query": "acme pumps" }))
        .looping_last_turn()
        .with_finale(
            r#"{"email": [], "phone": [], "company_name_english": "Acme Pumps International"}"#,
        );
    let chat_log = chat.clone();
    let transport = MockTransport::new();
    let transport_log = transport.clone();
    let finder = finder(chat, MockWebSearcher::new(), transport);

    let report = finder.find(&ContactQuery::new("Acme Pumps", "Iraq")).await;

    // Twelve tool turns, then the forced toolless finale.
    assert_eq!(report.turns_used, 12);
    assert_eq!(chat_log.tool_turn_count(), 12);
    assert!(chat_log
        .calls()
        .iter()
        .any(|call| matches!(call, ChatModelCall::ToolTurn { with_tools: false, .. })));
    assert_eq!(report.result.company_name, "Acme Pumps International");
    // Every search came back empty, so nothing was ever fetched.
    assert_eq!(transport_log.call_count(), 0);
}
