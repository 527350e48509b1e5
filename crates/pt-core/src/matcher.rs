//! Rule Matching Engine
//!
//! Applies one replacement rule to a document: either to the text nodes under
//! every element of a tag, or to one attribute of every element of a tag.
//!
//! A pattern is first compiled as a regular expression; when that fails (or
//! the rule opts out of regex) the pattern is replaced as a literal substring.
//! Counts are per changed node or element, not per match.

use log::{debug, warn};
use regex::{Captures, Regex};

use crate::dom::DomTree;
use crate::error::Result;
use crate::message::ReplaceOutcome;
use crate::types::{ReplacementRule, TagSelector};

// =============================================================================
// Substitution
// =============================================================================

/// A compiled find/replace pair.
#[derive(Debug, Clone)]
pub enum Substitution {
    /// Empty pattern, never matches.
    Never,
    Regex { regex: Regex, expansion: String },
    Literal { pattern: String, replacement: String },
}

impl Substitution {
    /// Compile a rule's pattern.
    ///
    /// Patterns use the `regex` crate's dialect. Browser-only syntax such as
    /// lookaround (`(?=..)`, `(?<!..)`) and backreferences (`\1`) does not
    /// compile there, so rules using it run as literal text here while the
    /// extension treats them as regexes.
    pub fn compile(pattern: &str, replacement: &str, use_regex: bool) -> Self {
        if pattern.is_empty() {
            return Self::Never;
        }

        if use_regex {
            match Regex::new(pattern) {
                Ok(regex) => {
                    let expansion = translate_replacement(replacement, &regex);
                    return Self::Regex { regex, expansion };
                }
                Err(e) => {
                    warn!("Treating {:?} as plain text due to invalid regex: {}", pattern, e);
                }
            }
        }

        Self::Literal {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    /// Replace every non-overlapping match in `text`.
    /// Returns `None` when nothing matched.
    pub fn replace(&self, text: &str) -> Option<String> {
        match self {
            Self::Never => None,
            Self::Regex { regex, expansion } => replace_regex(regex, expansion, text),
            Self::Literal { pattern, replacement } => {
                if text.contains(pattern.as_str()) {
                    Some(text.replace(pattern.as_str(), replacement))
                } else {
                    None
                }
            }
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }
}

fn replace_regex(regex: &Regex, expansion: &str, text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut matched = false;

    for caps in regex.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        // Zero-length matches would insert the replacement between every char
        if m.as_str().is_empty() {
            continue;
        }
        matched = true;
        out.push_str(&text[last..m.start()]);
        expand(&caps, expansion, &mut out);
        last = m.end();
    }

    if !matched {
        return None;
    }
    out.push_str(&text[last..]);
    Some(out)
}

#[inline]
fn expand(caps: &Captures<'_>, expansion: &str, out: &mut String) {
    caps.expand(expansion, out);
}

/// Translate a browser-style replacement string (`$&`, `$1`..`$99`,
/// `$<name>`, `$$`) into the regex crate's expansion syntax.
///
/// References to groups the pattern does not have stay literal, as they do
/// in the browser.
pub fn translate_replacement(replacement: &str, regex: &Regex) -> String {
    let groups = regex.captures_len() - 1;
    let has_names = regex.capture_names().any(|name| name.is_some());

    let bytes = replacement.as_bytes();
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut i = 0;

    while i < bytes.len() {
        let rest = &replacement[i..];
        let Some(dollar) = rest.find('$') else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..dollar]);
        i += dollar + 1;

        match bytes.get(i) {
            Some(b'$') => {
                out.push_str("$$");
                i += 1;
            }
            Some(b'&') => {
                out.push_str("${0}");
                i += 1;
            }
            Some(d) if d.is_ascii_digit() => {
                let first = (d - b'0') as usize;
                let two = bytes
                    .get(i + 1)
                    .filter(|b| b.is_ascii_digit())
                    .map(|b| first * 10 + (b - b'0') as usize);

                match two {
                    Some(n) if n >= 1 && n <= groups => {
                        out.push_str(&format!("${{{}}}", n));
                        i += 2;
                    }
                    _ if first >= 1 && first <= groups => {
                        out.push_str(&format!("${{{}}}", first));
                        i += 1;
                    }
                    _ => out.push_str("$$"),
                }
            }
            Some(b'<') if has_names => match replacement[i + 1..].find('>') {
                Some(end) => {
                    let name = &replacement[i + 1..i + 1 + end];
                    out.push_str(&format!("${{{}}}", name));
                    i += end + 2;
                }
                None => out.push_str("$$"),
            },
            _ => out.push_str("$$"),
        }
    }

    out
}

// =============================================================================
// Match Engine
// =============================================================================

/// A rule prepared for application to one or more documents.
pub struct MatchEngine<'r> {
    rule: &'r ReplacementRule,
    substitution: Substitution,
}

impl<'r> MatchEngine<'r> {
    pub fn new(rule: &'r ReplacementRule) -> Self {
        Self {
            rule,
            substitution: Substitution::compile(&rule.find_pattern, &rule.replacement, rule.use_regex),
        }
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Apply the rule, returning the number of changed nodes or elements.
    pub fn run<T: DomTree>(&self, tree: &mut T) -> Result<usize> {
        if matches!(self.substitution, Substitution::Never) {
            return Ok(0);
        }

        let count = match self.rule.selector() {
            TagSelector::Attribute { tag, attribute } => self.replace_attributes(tree, tag, attribute)?,
            TagSelector::Text { tag } => self.replace_text(tree, tag)?,
        };

        debug!(
            "Rule {:?} ({}) changed {} node(s)",
            self.rule.id, self.rule.tag_selector, count
        );
        Ok(count)
    }

    fn replace_attributes<T: DomTree>(&self, tree: &mut T, tag: &str, attribute: &str) -> Result<usize> {
        let mut count = 0;
        for element in tree.elements_by_tag_name(tag) {
            let Some(value) = tree.attribute(&element, attribute) else {
                continue;
            };
            if let Some(updated) = self.substitution.replace(&value) {
                tree.set_attribute(&element, attribute, &updated)?;
                count += 1;
            }
        }
        Ok(count)
    }

    fn replace_text<T: DomTree>(&self, tree: &mut T, tag: &str) -> Result<usize> {
        let mut count = 0;
        for element in tree.elements_by_tag_name(tag) {
            for node in tree.text_nodes_under(&element) {
                let Some(text) = tree.text(&node) else { continue };
                if let Some(updated) = self.substitution.replace(&text) {
                    tree.set_text(&node, &updated)?;
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

/// Apply a rule, propagating DOM failures.
pub fn apply_rule<T: DomTree>(rule: &ReplacementRule, tree: &mut T) -> Result<usize> {
    MatchEngine::new(rule).run(tree)
}

/// Apply rules in order, returning the summed count. A rule whose DOM
/// writes fail contributes nothing and does not stop the others.
pub fn apply_rules<'a, T, I>(rules: I, tree: &mut T) -> usize
where
    T: DomTree,
    I: IntoIterator<Item = &'a ReplacementRule>,
{
    let mut count = 0;
    for rule in rules {
        match apply_rule(rule, tree) {
            Ok(n) => count += n,
            Err(e) => warn!("Rule {} failed: {}", rule.id, e),
        }
    }
    count
}

/// Apply a rule and report the outcome. Never fails.
pub fn apply<T: DomTree>(rule: &ReplacementRule, tree: &mut T) -> ReplaceOutcome {
    match apply_rule(rule, tree) {
        Ok(count) => ReplaceOutcome::matched(count),
        Err(e) => {
            warn!("Replacement for rule {:?} failed: {}", rule.id, e);
            ReplaceOutcome::failed(e.to_string())
        }
    }
}
