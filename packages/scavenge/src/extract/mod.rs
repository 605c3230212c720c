//! Extraction and normalization library.
//!
//! Pure, synchronous, deterministic functions over text and HTML: email
//! and phone pattern matching, junk filtering, deduplication, address
//! candidates, and search-hit scoring. Both the search adapter and the
//! page fetcher consume this module; nothing here does I/O.

pub mod address;
pub mod emails;
pub mod html;
pub mod phones;
pub mod scoring;

pub use address::{collect_addresses, window_candidates};
pub use emails::{filter_emails, find_emails};
pub use phones::{clean_phone, collect_phones, find_phones};
pub use scoring::{company_tokens, host_of, rank_hits, same_root_domain, score_hit};

/// Raw signals harvested from one page before policy filtering.
#[derive(Debug, Default, Clone)]
pub struct PageSignals {
    /// Email candidates from regex scans, `mailto:` anchors, and
    /// `data-cfemail` decoding. Unfiltered.
    pub emails: Vec<String>,

    /// Phone candidates from the pattern battery and `tel:` anchors.
    /// Not yet normalized.
    pub phones: Vec<String>,

    /// Address candidates from `<address>` tags, JSON-LD, the footer,
    /// and marker windows. Not yet deduplicated.
    pub addresses: Vec<String>,

    /// Visible page text, whitespace-collapsed, uncapped.
    pub text: String,
}

impl PageSignals {
    /// Merge another page's signals in, keeping the other page's text as
    /// the preview source.
    pub fn absorb(&mut self, other: PageSignals) {
        self.emails.extend(other.emails);
        self.phones.extend(other.phones);
        self.addresses.extend(other.addresses);
        if !other.text.is_empty() {
            self.text = other.text;
        }
    }
}

/// Harvest every contact signal from one page's HTML.
///
/// `address_markers_lower` anchors the text-window heuristic; pass the
/// run's merged, lowercased address keywords. Output is raw and
/// uncapped; callers apply `ExtractPolicy` caps.
pub fn harvest_signals(html_src: &str, address_markers_lower: &[String]) -> PageSignals {
    let text = html::visible_text(html_src);

    let mut emails = find_emails(html_src);
    emails.extend(find_emails(&text));
    emails.extend(html::mailto_addresses(html_src));
    emails.extend(html::cfemail_addresses(html_src));

    let mut phones = find_phones(&text);
    phones.extend(html::tel_numbers(html_src));

    let mut addresses = html::address_tag_text(html_src);
    addresses.extend(html::jsonld_addresses(html_src));
    addresses.extend(html::footer_text(html_src));
    addresses.extend(window_candidates(&text, address_markers_lower));

    PageSignals {
        emails,
        phones,
        addresses,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTACT_PAGE: &str = r#"
        <html><body>
        <h1>Contact Acme Pumps</h1>
        <p>General: <a href="mailto:info@acme.example?subject=Hi">info@acme.example</a></p>
        <p>Export desk: export@acme.example</p>
        <p>Call <a href="tel:+902125554433">+90 212 555 44 33</a></p>
        <address>Organize Sanayi Bolgesi 5. Cadde No 12, 34555 Istanbul</address>
        <footer>Acme Pumps A.S. Head Office Istanbul</footer>
        </body></html>
    "#;

    #[test]
    fn test_harvest_collects_all_signal_kinds() {
        let markers = vec!["office".to_string()];
        let signals = harvest_signals(CONTACT_PAGE, &markers);

        assert!(signals
            .emails
            .iter()
            .any(|e| e == "info@acme.example"));
        assert!(signals
            .emails
            .iter()
            .any(|e| e == "export@acme.example"));
        assert!(signals.phones.iter().any(|p| p == "+902125554433"));
        assert!(signals
            .addresses
            .iter()
            .any(|a| a.contains("34555 Istanbul")));
        assert!(signals
            .addresses
            .iter()
            .any(|a| a.starts_with("Footer: ")));
        assert!(signals.text.contains("Contact Acme Pumps"));
    }

    #[test]
    fn test_absorb_prefers_other_text() {
        let mut landing = PageSignals {
            emails: vec!["info@acme.example".to_string()],
            text: "landing".to_string(),
            ..PageSignals::default()
        };
        let contact = PageSignals {
            emails: vec!["export@acme.example".to_string()],
            text: "contact page".to_string(),
            ..PageSignals::default()
        };
        landing.absorb(contact);

        assert_eq!(landing.emails.len(), 2);
        assert_eq!(landing.text, "contact page");
    }
}
