//! Link Scanner
//!
//! Lists the absolute http(s) targets of a page's anchor tags, deduplicated on
//! exact text in first-seen order.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use pt_core::url::is_http_url;

/// A way of finding anchor `href` values in an HTML string.
pub trait LinkExtractor {
    /// Short name for logs and CLI output.
    fn name(&self) -> &'static str;

    /// Raw `href` values of every anchor, in document order.
    fn hrefs(&self, html: &str) -> Vec<String>;

    /// Absolute http(s) links, deduplicated in first-seen order.
    fn extract(&self, html: &str) -> Vec<String> {
        collect_links(self.hrefs(html))
    }
}

impl<E: LinkExtractor + ?Sized> LinkExtractor for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn hrefs(&self, html: &str) -> Vec<String> {
        (**self).hrefs(html)
    }
}

/// Keep trimmed http(s) values, dropping exact duplicates.
pub fn collect_links<I, S>(hrefs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs {
        let href = href.as_ref().trim();
        if !is_http_url(href) {
            continue;
        }
        if seen.insert(href.to_string()) {
            links.push(href.to_string());
        }
    }

    links
}

/// The best extractor compiled into this build.
pub fn default_extractor() -> Box<dyn LinkExtractor + Send + Sync> {
    #[cfg(feature = "html-parser")]
    {
        Box::new(ParserExtractor::new())
    }
    #[cfg(not(feature = "html-parser"))]
    {
        Box::new(RegexExtractor::new())
    }
}

/// Extract links with the default extractor.
pub fn extract_links(html: &str) -> Vec<String> {
    default_extractor().extract(html)
}

// =============================================================================
// Regex Strategy
// =============================================================================

const ANCHOR_PATTERN: &str = r#"(?i)<a\s+(?:[^>]*?\s+)?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#;

fn anchor_regex() -> &'static Regex {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    ANCHOR.get_or_init(|| Regex::new(ANCHOR_PATTERN).expect("anchor pattern is valid"))
}

/// Matches `<a ... href="...">` with single or double quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl RegexExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for RegexExtractor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn hrefs(&self, html: &str) -> Vec<String> {
        anchor_regex()
            .captures_iter(html)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| decode_entities(m.as_str()).into_owned())
            .collect()
    }
}

/// Decode the character references that commonly appear in URLs.
pub fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_reference(&rest[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// =============================================================================
// Parser Strategy
// =============================================================================

#[cfg(feature = "html-parser")]
pub use parser::ParserExtractor;

#[cfg(feature = "html-parser")]
mod parser {
    use std::sync::OnceLock;

    use scraper::{Html, Selector};

    use super::LinkExtractor;

    fn anchor_selector() -> &'static Selector {
        static ANCHOR: OnceLock<Selector> = OnceLock::new();
        ANCHOR.get_or_init(|| Selector::parse("a[href]").expect("anchor selector is valid"))
    }

    /// Parses the document and queries its anchors.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ParserExtractor;

    impl ParserExtractor {
        pub fn new() -> Self {
            Self
        }
    }

    impl LinkExtractor for ParserExtractor {
        fn name(&self) -> &'static str {
            "parser"
        }

        fn hrefs(&self, html: &str) -> Vec<String> {
            let document = Html::parse_document(html);
            document
                .select(anchor_selector())
                .filter_map(|a| a.value().attr("href"))
                .map(str::to_string)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>t</title></head>
<body>
  <p>Intro <a href="https://one.test/">one</a></p>
  <A class="x" HREF='http://two.test/path?a=1&amp;b=2'>two</A>
  <a href="https://one.test/">dup</a>
  <a href="https://one.test">no slash</a>
  <a href="mailto:me@one.test">mail</a>
  <a href="javascript:void(0)">js</a>
  <a href="/relative">rel</a>
  <a data-href="https://data.test/" href="  https://three.test/  ">spaced</a>
  <abbr href="https://abbr.test/">not a link</abbr>
</body></html>"#;

    const EXPECTED: &[&str] = &[
        "https://one.test/",
        "http://two.test/path?a=1&b=2",
        "https://one.test",
        "https://three.test/",
    ];

    #[test]
    fn regex_strategy_extracts_http_links() {
        assert_eq!(RegexExtractor::new().extract(PAGE), EXPECTED);
    }

    #[cfg(feature = "html-parser")]
    #[test]
    fn strategies_agree_on_well_formed_markup() {
        assert_eq!(ParserExtractor::new().extract(PAGE), EXPECTED);
        assert_eq!(
            ParserExtractor::new().extract(PAGE),
            RegexExtractor::new().extract(PAGE)
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_links(PAGE);
        assert_eq!(extract_links(PAGE), first);
    }

    #[test]
    fn never_returns_other_schemes() {
        let html = r#"<a href="ftp://x.test/">f</a><a href="data:text/html,hi">d</a><a href='HTTPS://UP.test/'>u</a>"#;
        assert_eq!(RegexExtractor::new().extract(html), vec!["HTTPS://UP.test/"]);
    }

    #[test]
    fn empty_input_has_no_links() {
        assert!(extract_links("").is_empty());
        assert!(RegexExtractor::new().extract("<p>no anchors</p>").is_empty());
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a&amp;b"), "a&b");
        assert_eq!(decode_entities("&#47;&#x2F;&quot;"), "//\"");
        assert_eq!(decode_entities("a & b &bogus; c"), "a & b &bogus; c");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed(_)));
    }
}
