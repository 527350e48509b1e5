//! Rule and permitted-domain stores
//!
//! Both stores are read-modify-write views over a [`StorageBackend`] holding
//! JSON values under fixed keys, the same layout the extensions keep in their
//! local storage area. There is no locking: the last writer wins.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{self, normalize_hostname};
use crate::error::{Error, Result};
use crate::message::AddStatus;
use crate::selector::rule_applies;
use crate::types::{ReplacementRule, RuleDraft};
use crate::url::clean_domain_input;

/// Storage key of the rule list.
pub const RULES_KEY: &str = "savedSets";
/// Storage key of the permitted-domain list.
pub const DOMAINS_KEY: &str = "permittedDomains";

// =============================================================================
// Storage Backend
// =============================================================================

/// Key/value storage holding JSON values.
pub trait StorageBackend {
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn save(&mut self, key: &str, value: Value) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for &mut B {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        (**self).save(key, value)
    }
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

fn load_list<T: DeserializeOwned, B: StorageBackend>(backend: &B, key: &str) -> Result<Vec<T>> {
    match backend.load(key)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|source| Error::Decode {
            key: key.to_string(),
            source,
        }),
    }
}

fn save_list<T: Serialize, B: StorageBackend>(backend: &mut B, key: &str, items: &[T]) -> Result<()> {
    let value = serde_json::to_value(items).map_err(|e| Error::Storage(e.to_string()))?;
    backend.save(key, value)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =============================================================================
// Rule Store
// =============================================================================

/// Saved replacement rules, in insertion order.
pub struct RuleStore<B> {
    backend: B,
}

impl<B: StorageBackend> RuleStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    /// All rules. A missing list reads as empty.
    pub fn list(&self) -> Result<Vec<ReplacementRule>> {
        load_list(&self.backend, RULES_KEY)
    }

    pub fn get(&self, id: &str) -> Result<ReplacementRule> {
        self.list()?
            .into_iter()
            .find(|rule| rule.id == id)
            .ok_or_else(|| Error::RuleNotFound(id.to_string()))
    }

    /// Enabled rules for a page host, in store order.
    pub fn applicable(&self, hostname: &str) -> Result<Vec<ReplacementRule>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|rule| rule_applies(rule, hostname))
            .collect())
    }

    /// Validate and save a new rule, enabled.
    pub fn add(&mut self, draft: RuleDraft) -> Result<ReplacementRule> {
        self.add_at(draft, now_millis())
    }

    /// Like [`RuleStore::add`] with an explicit creation timestamp. The id is
    /// the timestamp, bumped until it is unique.
    pub fn add_at(&mut self, draft: RuleDraft, timestamp_ms: u64) -> Result<ReplacementRule> {
        let mut rules = self.list()?;

        let mut stamp = timestamp_ms;
        while rules.iter().any(|rule| rule.id == stamp.to_string()) {
            stamp += 1;
        }

        let rule = draft.into_rule(stamp.to_string())?;
        rules.push(rule.clone());
        save_list(&mut self.backend, RULES_KEY, &rules)?;

        debug!("Saved rule {} for {:?}", rule.id, rule.domain);
        Ok(rule)
    }

    /// Flip a rule's enabled flag and return the updated rule.
    pub fn toggle(&mut self, id: &str) -> Result<ReplacementRule> {
        let mut rules = self.list()?;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or_else(|| Error::RuleNotFound(id.to_string()))?;
        rule.enabled = !rule.enabled;
        let updated = rule.clone();

        save_list(&mut self.backend, RULES_KEY, &rules)?;
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        let mut rules = self.list()?;
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        if rules.len() == before {
            return Err(Error::RuleNotFound(id.to_string()));
        }
        save_list(&mut self.backend, RULES_KEY, &rules)
    }
}

// =============================================================================
// Domain Store
// =============================================================================

/// Hostnames the link extractor may fetch from, normalized and deduplicated.
pub struct DomainStore<B> {
    backend: B,
}

impl<B: StorageBackend> DomainStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    pub fn list(&self) -> Result<Vec<String>> {
        load_list(&self.backend, DOMAINS_KEY)
    }

    /// Add a hostname (a full URL is reduced to its host).
    /// Returns the normalized form and whether it was new.
    pub fn add(&mut self, domain: &str) -> Result<(AddStatus, String)> {
        let normalized = normalize_domain_input(domain)?;
        let mut domains = self.list()?;

        if domains.contains(&normalized) {
            return Ok((AddStatus::Exists, normalized));
        }

        domains.push(normalized.clone());
        save_list(&mut self.backend, DOMAINS_KEY, &domains)?;
        debug!("Permitted domain {}", normalized);
        Ok((AddStatus::Success, normalized))
    }

    /// Remove a hostname. Returns whether it was present.
    pub fn remove(&mut self, domain: &str) -> Result<bool> {
        let normalized = normalize_domain_input(domain)?;
        let mut domains = self.list()?;
        let before = domains.len();
        domains.retain(|d| d != &normalized);
        if domains.len() == before {
            return Ok(false);
        }
        save_list(&mut self.backend, DOMAINS_KEY, &domains)?;
        Ok(true)
    }

    pub fn is_permitted(&self, hostname: &str) -> Result<bool> {
        Ok(domain::is_permitted(hostname, &self.list()?))
    }
}

fn normalize_domain_input(input: &str) -> Result<String> {
    let normalized = normalize_hostname(clean_domain_input(input.trim()));
    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return Err(Error::InvalidDomain(input.to_string()));
    }
    Ok(normalized)
}
