//! WebAssembly bindings for PageTools
//!
//! The extension scripts own storage and messaging; these entry points are
//! stateless. Rules and permitted-domain lists are passed in from
//! `chrome.storage` on every call.

use wasm_bindgen::prelude::*;

use pt_core::message::{MessageKind, ReplaceOutcome};
use pt_core::{
    apply, apply_rules, is_permitted as domain_is_permitted, select_applicable as select_rules, FetchError,
    Overlay, OverlayContent, ReplacementRule, Response, Ticket,
};
use pt_html::LinkExtractor;

pub mod page;

pub use page::{page_extractor, DomParserExtractor, PageDom};

const NO_DOCUMENT: &str = "No document available";

fn parse_rules(rules_json: &str) -> Result<Vec<ReplacementRule>, JsValue> {
    serde_json::from_str(rules_json).map_err(|e| JsValue::from_str(&format!("Invalid rules: {}", e)))
}

fn string_list(value: &JsValue) -> Vec<String> {
    js_sys::Array::from(value)
        .iter()
        .filter_map(|entry| entry.as_string())
        .collect()
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn outcome_to_js(outcome: &ReplaceOutcome) -> JsValue {
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"success".into(), &JsValue::from(outcome.success));
    if let Some(count) = outcome.matched_count {
        let _ = js_sys::Reflect::set(&result, &"matchedCount".into(), &JsValue::from(count as u32));
    }
    if let Some(message) = &outcome.message {
        let _ = js_sys::Reflect::set(&result, &"message".into(), &JsValue::from_str(message));
    }
    result.into()
}

fn current_hostname() -> Option<String> {
    web_sys::window()?.location().hostname().ok()
}

fn parse_kind(kind: &str) -> MessageKind {
    match kind {
        "warning" => MessageKind::Warning,
        "error" => MessageKind::Error,
        _ => MessageKind::Info,
    }
}

// =============================================================================
// Text Replacer
// =============================================================================

/// Run one find/replace over the current page.
#[wasm_bindgen]
pub fn replace_text(
    tag_selector: &str,
    find_pattern: &str,
    replacement: &str,
    use_regex: Option<bool>,
) -> JsValue {
    let Some(mut dom) = PageDom::current() else {
        return outcome_to_js(&ReplaceOutcome::failed(NO_DOCUMENT));
    };

    let mut rule = ReplacementRule::ad_hoc(tag_selector, find_pattern, replacement);
    rule.use_regex = use_regex.unwrap_or(true);
    outcome_to_js(&apply(&rule, &mut dom))
}

/// Apply every saved rule that targets `hostname` (default: the page's host).
#[wasm_bindgen]
pub fn apply_all_rules(rules_json: &str, hostname: Option<String>) -> Result<JsValue, JsValue> {
    let rules = parse_rules(rules_json)?;
    let hostname = hostname.or_else(current_hostname).unwrap_or_default();
    let mut dom = PageDom::current().ok_or_else(|| JsValue::from_str(NO_DOCUMENT))?;

    let applicable = select_rules(&rules, &hostname);
    let count = apply_rules(applicable.iter().copied(), &mut dom);
    to_js(&Response::rules_applied(count, applicable.len()))
}

/// Rules from `rules_json` that apply on `hostname`, in stored order.
#[wasm_bindgen]
pub fn select_applicable(rules_json: &str, hostname: &str) -> Result<JsValue, JsValue> {
    let rules = parse_rules(rules_json)?;
    let applicable = select_rules(&rules, hostname);
    to_js(&applicable)
}

// =============================================================================
// Link Extractor
// =============================================================================

#[wasm_bindgen]
pub fn is_permitted(hostname: &str, permitted_domains: JsValue) -> bool {
    domain_is_permitted(hostname, &string_list(&permitted_domains))
}

/// Absolute http(s) links of `html`, deduplicated in first-seen order.
#[wasm_bindgen]
pub fn extract_links(html: &str) -> js_sys::Array {
    let links = js_sys::Array::new();
    for link in page_extractor().extract(html) {
        links.push(&JsValue::from_str(&link));
    }
    links
}

/// Message for a failed fetch. Status 0 means the request never completed.
#[wasm_bindgen]
pub fn classify_fetch_failure(url: &str, status: u16, status_text: &str) -> String {
    FetchError::from_status(url, status, status_text).to_string()
}

/// Display state of the link overlay on one page.
#[wasm_bindgen]
pub struct LinkOverlay {
    inner: Overlay,
}

impl Default for LinkOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl LinkOverlay {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self { inner: Overlay::new() }
    }

    /// Start loading `source_url`; returns the ticket to deliver results with.
    pub fn begin(&mut self, source_url: &str) -> f64 {
        self.inner.begin(source_url).as_u64() as f64
    }

    pub fn deliver_links(&mut self, ticket: f64, links: JsValue, source_url: &str) -> bool {
        self.inner.deliver(
            Ticket::from_u64(ticket as u64),
            OverlayContent::Links {
                links: string_list(&links),
                source_url: source_url.to_string(),
            },
        )
    }

    pub fn deliver_message(&mut self, ticket: f64, text: &str, kind: &str) -> bool {
        self.inner.deliver(
            Ticket::from_u64(ticket as u64),
            OverlayContent::Message {
                text: text.to_string(),
                kind: parse_kind(kind),
            },
        )
    }

    pub fn show_message(&mut self, text: &str, kind: &str) {
        self.inner.show_message(text, parse_kind(kind));
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Current content as `{type, ...}`, or `null`.
    pub fn content(&self) -> JsValue {
        match self.inner.content() {
            Some(content) => to_js(content).unwrap_or(JsValue::NULL),
            None => JsValue::NULL,
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use pt_core::DomTree;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn extracts_raw_http_hrefs() {
        let links = extract_links(
            r#"<a href="https://a.test/">a</a><a href="/rel">r</a><a href="https://a.test/">dup</a>"#,
        );
        assert_eq!(links.length(), 1);
        assert_eq!(links.get(0).as_string().as_deref(), Some("https://a.test/"));
    }

    #[wasm_bindgen_test]
    fn classifies_failures() {
        assert_eq!(
            classify_fetch_failure("https://a.test/", 404, "Not Found"),
            "HTTP error 404 (Page Not Found.) when fetching https://a.test/"
        );
    }

    #[wasm_bindgen_test]
    fn replaces_in_the_live_page() {
        let mut dom = PageDom::current().unwrap();
        let document = web_sys::window().unwrap().document().unwrap();
        let body = document.body().unwrap();
        body.set_inner_html("<p>a cat <b>cat</b></p>");

        let rule = ReplacementRule::ad_hoc("p", "cat", "dog");
        assert_eq!(pt_core::apply_rule(&rule, &mut dom).unwrap(), 2);
        assert_eq!(body.inner_html(), "<p>a dog <b>dog</b></p>");
        assert_eq!(dom.elements_by_tag_name("P").len(), 1);
    }

    #[wasm_bindgen_test]
    fn overlay_drops_stale_tickets() {
        let mut overlay = LinkOverlay::new();
        let first = overlay.begin("https://one.test/");
        let second = overlay.begin("https://two.test/");
        assert!(!overlay.deliver_message(first, "late", "error"));
        assert!(overlay.deliver_links(second, js_sys::Array::new().into(), "https://two.test/"));
        overlay.close();
        assert!(overlay.content().is_null());
    }
}
