//! Core type definitions for PageTools
//!
//! These types map directly to the records the extensions keep in storage and
//! are used throughout the engine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::url::clean_domain_input;

/// Separator between the tag name and the attribute name in a tag selector.
pub const ATTRIBUTE_SEPARATOR: char = ';';

fn default_true() -> bool {
    true
}

// =============================================================================
// Replacement Rule
// =============================================================================

/// A saved find/replace instruction scoped to a tag and a domain.
///
/// Field names follow the stored schema; the longer names are accepted on
/// read for records written by other tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub id: String,
    #[serde(rename = "tagName", alias = "tagSelector")]
    pub tag_selector: String,
    #[serde(rename = "findText", alias = "findPattern")]
    pub find_pattern: String,
    #[serde(rename = "replaceText", alias = "replacement", default)]
    pub replacement: String,
    /// Bare hostname, empty for every domain.
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "useRegex", default = "default_true")]
    pub use_regex: bool,
}

impl ReplacementRule {
    /// An unsaved rule for a one-off replacement request.
    pub fn ad_hoc(tag_selector: &str, find_pattern: &str, replacement: &str) -> Self {
        Self {
            id: String::new(),
            tag_selector: tag_selector.to_string(),
            find_pattern: find_pattern.to_string(),
            replacement: replacement.to_string(),
            domain: String::new(),
            enabled: true,
            use_regex: true,
        }
    }

    pub fn selector(&self) -> TagSelector<'_> {
        TagSelector::parse(&self.tag_selector)
    }
}

// =============================================================================
// Rule Draft
// =============================================================================

/// User input for a rule that has not been saved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    #[serde(alias = "tagName")]
    pub tag_selector: String,
    #[serde(alias = "findText")]
    pub find_pattern: String,
    #[serde(alias = "replaceText", default)]
    pub replacement: String,
    /// Hostname or URL; cleaned to a bare hostname on save.
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_true")]
    pub use_regex: bool,
}

impl RuleDraft {
    pub fn new(tag_selector: &str, find_pattern: &str, replacement: &str, domain: &str) -> Self {
        Self {
            tag_selector: tag_selector.to_string(),
            find_pattern: find_pattern.to_string(),
            replacement: replacement.to_string(),
            domain: domain.to_string(),
            use_regex: true,
        }
    }

    /// Validate the draft and turn it into a rule with the given id.
    pub fn into_rule(self, id: String) -> Result<ReplacementRule> {
        let tag_selector = self.tag_selector.trim();
        if tag_selector.is_empty() {
            return Err(Error::MissingTagSelector);
        }
        if self.find_pattern.is_empty() {
            return Err(Error::MissingFindPattern);
        }

        let domain = clean_domain_input(self.domain.trim());
        if domain.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDomain(self.domain));
        }

        Ok(ReplacementRule {
            id,
            tag_selector: tag_selector.to_string(),
            find_pattern: self.find_pattern,
            replacement: self.replacement,
            domain: domain.to_string(),
            enabled: true,
            use_regex: self.use_regex,
        })
    }
}

// =============================================================================
// Tag Selector
// =============================================================================

/// Parsed form of a rule's tag selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSelector<'a> {
    /// Replace inside the text nodes under every `tag` element.
    Text { tag: &'a str },
    /// Replace inside the `attribute` value of every `tag` element.
    Attribute { tag: &'a str, attribute: &'a str },
}

impl<'a> TagSelector<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(ATTRIBUTE_SEPARATOR) {
            Some((tag, rest)) => {
                // "a;href;x" addresses the "href" attribute, extra segments are ignored
                let attribute = rest.split(ATTRIBUTE_SEPARATOR).next().unwrap_or(rest);
                TagSelector::Attribute {
                    tag: tag.trim(),
                    attribute: attribute.trim(),
                }
            }
            None => TagSelector::Text { tag: raw.trim() },
        }
    }

    pub fn tag(&self) -> &'a str {
        match self {
            TagSelector::Text { tag } | TagSelector::Attribute { tag, .. } => tag,
        }
    }
}

// =============================================================================
// Extraction Result
// =============================================================================

/// Links found on a source page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub links: Vec<String>,
    pub source_url: String,
}
