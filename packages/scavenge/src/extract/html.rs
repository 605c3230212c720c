//! DOM-level signal harvesting.
//!
//! Everything here takes raw HTML and returns owned data, parsing the
//! document internally. `scraper`'s DOM types are not `Send`, so they
//! must never be held across an await point; keeping the parse scoped to
//! each function enforces that.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    // Script/style/noscript bodies would otherwise leak into text nodes
    static ref NON_CONTENT_BLOCKS: Regex =
        Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap();
}

// Selectors are literals; parse failures would be programming errors.
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Visible page text with markup removed and whitespace collapsed.
pub fn visible_text(html: &str) -> String {
    let cleaned = NON_CONTENT_BLOCKS.replace_all(html, " ");
    let doc = Html::parse_document(&cleaned);
    element_text(doc.root_element())
}

/// `mailto:` targets from anchors, query part stripped.
pub fn mailto_addresses(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchors = selector("a[href]");
    doc.select(&anchors)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let target = href.strip_prefix("mailto:")?;
            let addr = target
                .split('?')
                .next()
                .unwrap_or_default()
                .replace("%20", "")
                .trim()
                .to_string();
            (!addr.is_empty()).then_some(addr)
        })
        .collect()
}

/// `tel:` targets from anchors.
pub fn tel_numbers(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchors = selector("a[href]");
    doc.select(&anchors)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let number = href.strip_prefix("tel:")?.trim().to_string();
            (!number.is_empty()).then_some(number)
        })
        .collect()
}

/// Decode a Cloudflare `data-cfemail` hex string. The first byte is the
/// XOR key for the rest.
pub fn decode_cfemail(hex: &str) -> Option<String> {
    if hex.len() < 4 || hex.len() % 2 != 0 {
        return None;
    }
    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<_, _>>()
        .ok()?;
    let key = bytes[0];
    let decoded: Vec<u8> = bytes[1..].iter().map(|b| b ^ key).collect();
    String::from_utf8(decoded).ok()
}

/// Emails hidden behind Cloudflare's `data-cfemail` obfuscation.
pub fn cfemail_addresses(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let obfuscated = selector("[data-cfemail]");
    doc.select(&obfuscated)
        .filter_map(|el| el.value().attr("data-cfemail").and_then(decode_cfemail))
        .collect()
}

/// Text of `<address>` elements.
pub fn address_tag_text(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let tags = selector("address");
    doc.select(&tags)
        .map(element_text)
        .filter(|t| t.chars().count() > 10)
        .collect()
}

/// Footer text when reasonably short, prefixed so readers know its
/// origin. Footers longer than 500 chars are navigation dumps, not
/// addresses.
pub fn footer_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let footer = selector("footer");
    let el = doc.select(&footer).next()?;
    let text = element_text(el);
    (!text.is_empty() && text.chars().count() < 500).then(|| format!("Footer: {text}"))
}

/// Postal addresses from JSON-LD `Organization`/`LocalBusiness` blocks,
/// subfields joined into one display string.
pub fn jsonld_addresses(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let scripts = selector(r#"script[type="application/ld+json"]"#);
    let mut found = Vec::new();
    for el in doc.select(&scripts) {
        let raw: String = el.text().collect();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
            collect_jsonld_addresses(&value, &mut found);
        }
    }
    found
}

fn collect_jsonld_addresses(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_jsonld_addresses(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            if map.get("@type").is_some_and(is_org_type) {
                if let Some(address) = map.get("address").and_then(format_postal_address) {
                    out.push(address);
                }
            }
            if let Some(graph) = map.get("@graph") {
                collect_jsonld_addresses(graph, out);
            }
        }
        _ => {}
    }
}

fn is_org_type(type_value: &serde_json::Value) -> bool {
    let matches_name = |name: &str| name == "Organization" || name == "LocalBusiness";
    match type_value {
        serde_json::Value::String(s) => matches_name(s),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .any(matches_name),
        _ => false,
    }
}

fn format_postal_address(address: &serde_json::Value) -> Option<String> {
    match address {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Object(map) => {
            let parts: Vec<&str> = [
                "streetAddress",
                "addressLocality",
                "addressRegion",
                "postalCode",
                "addressCountry",
            ]
            .iter()
            .filter_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        serde_json::Value::Array(items) => items.iter().find_map(format_postal_address),
        _ => None,
    }
}

/// Same-host contact-link candidates resolved against the page URL.
///
/// Anchors whose href matches a contact keyword rank before anchors that
/// only match on link text. Keywords are expected lowercase.
pub fn contact_link_candidates(html: &str, base: &Url, keywords_lower: &[String]) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchors = selector("a[href]");
    let base_host = normalized_host(base);

    let mut by_href = Vec::new();
    let mut by_text = Vec::new();
    for el in doc.select(&anchors) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
            || href.starts_with('#')
        {
            continue;
        }
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if normalized_host(&resolved) != base_host || resolved == *base {
            continue;
        }

        let href_lower = resolved.as_str().to_lowercase();
        if keywords_lower.iter().any(|k| href_lower.contains(k.as_str())) {
            by_href.push(resolved.to_string());
        } else {
            let text_lower = element_text(el).to_lowercase();
            if keywords_lower.iter().any(|k| text_lower.contains(k.as_str())) {
                by_text.push(resolved.to_string());
            }
        }
    }

    by_href.extend(by_text);
    let mut seen = std::collections::HashSet::new();
    by_href.retain(|url| seen.insert(url.clone()));
    by_href
}

fn normalized_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_text_skips_scripts() {
        let html = r#"
            <html><head><style>body { color: red; }</style></head>
            <body><h1>Acme</h1><script>var tracker = "info@tracker.example";</script>
            <p>Quality   pumps since
            1982.</p></body></html>
        "#;
        let text = visible_text(html);
        assert!(text.contains("Acme"));
        assert!(text.contains("Quality pumps since 1982."));
        assert!(!text.contains("tracker"));
    }

    #[test]
    fn test_mailto_query_stripped() {
        let html = r#"<a href="mailto:info@acme.example?subject=Quote">Write us</a>"#;
        assert_eq!(mailto_addresses(html), vec!["info@acme.example"]);
    }

    #[test]
    fn test_tel_anchor() {
        let html = r#"<a href="tel:+902125554433">Call</a>"#;
        assert_eq!(tel_numbers(html), vec!["+902125554433"]);
    }

    #[test]
    fn test_decode_cfemail_round() {
        // Key 0x42, "a@b.co" XORed with it.
        let encoded: String = std::iter::once(0x42u8)
            .chain("a@b.co".bytes().map(|b| b ^ 0x42))
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_eq!(decode_cfemail(&encoded), Some("a@b.co".to_string()));
        assert_eq!(decode_cfemail("zz"), None);
        assert_eq!(decode_cfemail("abc"), None);
    }

    #[test]
    fn test_cfemail_attribute_decoded() {
        let encoded: String = std::iter::once(0x17u8)
            .chain("sales@acme.example".bytes().map(|b| b ^ 0x17))
            .map(|b| format!("{b:02x}"))
            .collect();
        let html = format!(r#"<span class="__cf_email__" data-cfemail="{encoded}">[email protected]</span>"#);
        assert_eq!(cfemail_addresses(&html), vec!["sales@acme.example"]);
    }

    #[test]
    fn test_address_tag() {
        let html = "<address>5. Cadde No 12, 34555 Istanbul</address>";
        assert_eq!(
            address_tag_text(html),
            vec!["5. Cadde No 12, 34555 Istanbul"]
        );
    }

    #[test]
    fn test_footer_prefix_and_length_gate() {
        let html = "<body><footer>Acme Inc, Hill Avenue 22, Summit City</footer></body>";
        assert_eq!(
            footer_text(html),
            Some("Footer: Acme Inc, Hill Avenue 22, Summit City".to_string())
        );

        let long = format!("<footer>{}</footer>", "nav ".repeat(200));
        assert_eq!(footer_text(&long), None);
    }

    #[test]
    fn test_jsonld_organization_address() {
        let html = r#"<script type="application/ld+json">
        {"@context": "https://schema.org", "@type": "Organization",
         "name": "Acme",
         "address": {"@type": "PostalAddress", "streetAddress": "Hill Avenue 22",
                     "addressLocality": "Summit City", "postalCode": "12345",
                     "addressCountry": "US"}}
        </script>"#;
        assert_eq!(
            jsonld_addresses(html),
            vec!["Hill Avenue 22, Summit City, 12345, US"]
        );
    }

    #[test]
    fn test_jsonld_graph_and_type_array() {
        let html = r#"<script type="application/ld+json">
        {"@graph": [{"@type": ["LocalBusiness", "Store"],
                     "address": "Harbor Road 1, Portstown"}]}
        </script>"#;
        assert_eq!(jsonld_addresses(html), vec!["Harbor Road 1, Portstown"]);
    }

    #[test]
    fn test_contact_links_ranked_and_same_host() {
        let base = Url::parse("https://acme.example/").unwrap();
        let html = r##"
            <a href="/products">Products</a>
            <a href="/reach-us">Contact</a>
            <a href="/iletisim">İletişim</a>
            <a href="https://other.example/contact">Partner contact</a>
            <a href="#contact">Jump</a>
        "##;
        let keywords = vec!["contact".to_string(), "iletisim".to_string()];
        let candidates = contact_link_candidates(html, &base, &keywords);

        // href match ("/iletisim") ranks before the text-only match.
        assert_eq!(
            candidates,
            vec![
                "https://acme.example/iletisim".to_string(),
                "https://acme.example/reach-us".to_string(),
            ]
        );
    }

    #[test]
    fn test_contact_links_skip_self() {
        let base = Url::parse("https://acme.example/contact").unwrap();
        let html = r#"<a href="/contact">Contact</a><a href="/contact/form">Form</a>"#;
        let keywords = vec!["contact".to_string()];
        let candidates = contact_link_candidates(html, &base, &keywords);
        assert_eq!(
            candidates,
            vec!["https://acme.example/contact/form".to_string()]
        );
    }
}
