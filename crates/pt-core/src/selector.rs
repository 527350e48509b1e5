//! Per-page rule selection.

use crate::types::ReplacementRule;

/// Whether a rule should run on a page served from `hostname`.
///
/// An empty domain applies everywhere. Otherwise the page host only has to
/// *contain* the rule's domain, so `example.com` also matches
/// `notexample.com` and `example.com.attacker.net`. Stored rules depend on
/// this looser test, so it is kept as is.
#[inline]
pub fn rule_applies(rule: &ReplacementRule, hostname: &str) -> bool {
    rule.enabled && (rule.domain.is_empty() || hostname.contains(rule.domain.as_str()))
}

/// Rules that apply to `hostname`, in store order.
pub fn select_applicable<'a>(rules: &'a [ReplacementRule], hostname: &str) -> Vec<&'a ReplacementRule> {
    rules.iter().filter(|rule| rule_applies(rule, hostname)).collect()
}
