//! Wire messages exchanged between the extension surfaces and the engine.
//!
//! Requests are tagged by `action`, matching what the popup, options page and
//! background script send each other.

use serde::{Deserialize, Serialize};

use crate::types::{ReplacementRule, RuleDraft};

/// An action requested by a UI surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// One-off replacement on the current page.
    #[serde(rename_all = "camelCase")]
    ReplaceText {
        #[serde(alias = "tagName")]
        tag_selector: String,
        #[serde(alias = "findText")]
        find_pattern: String,
        #[serde(alias = "replaceText", default)]
        replacement: String,
        #[serde(default)]
        use_regex: Option<bool>,
    },
    /// Apply every saved rule that matches the current page.
    ApplyAllRules,
    /// Fetch a hyperlink's target page and list its links.
    #[serde(rename_all = "camelCase")]
    ExtractLinks {
        #[serde(alias = "url")]
        source_url: String,
    },
    AddDomain { domain: String },
    RemoveDomain { domain: String },
    SaveRule { rule: RuleDraft },
    ToggleRule { id: String },
    DeleteRule { id: String },
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::ReplaceText { .. } => "replaceText",
            Request::ApplyAllRules => "applyAllRules",
            Request::ExtractLinks { .. } => "extractLinks",
            Request::AddDomain { .. } => "addDomain",
            Request::RemoveDomain { .. } => "removeDomain",
            Request::SaveRule { .. } => "saveRule",
            Request::ToggleRule { .. } => "toggleRule",
            Request::DeleteRule { .. } => "deleteRule",
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Result of a replacement: `{success, matchedCount}` or `{success:false, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReplaceOutcome {
    pub fn matched(count: usize) -> Self {
        Self {
            success: true,
            matched_count: Some(count),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            matched_count: None,
            message: Some(message.into()),
        }
    }

    pub fn count(&self) -> usize {
        self.matched_count.unwrap_or(0)
    }
}

/// Whether an added domain was new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddStatus {
    Success,
    Exists,
}

/// Style hint for messages shown in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Replaced(ReplaceOutcome),
    #[serde(rename_all = "camelCase")]
    RulesApplied {
        success: bool,
        count: usize,
        rules_applied: usize,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Links { links: Vec<String>, source_url: String },
    /// The target host is not permitted; the user should add it.
    #[serde(rename_all = "camelCase")]
    PermissionRequired {
        hostname: String,
        message: String,
        kind: MessageKind,
    },
    DomainAdded { status: AddStatus, domain: String },
    DomainRemoved { removed: bool, domain: String },
    RuleSaved { success: bool, rule: ReplacementRule },
    RuleToggled { success: bool, id: String, enabled: bool },
    RuleDeleted { success: bool, id: String },
    #[serde(rename_all = "camelCase")]
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
    },
    Failure { success: bool, message: String },
}

impl Response {
    /// Summary of an apply-all-rules pass.
    pub fn rules_applied(count: usize, rules_applied: usize) -> Self {
        Response::RulesApplied {
            success: true,
            count,
            rules_applied,
            message: format!("Applied {} replacements", count),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Response::Failure {
            success: false,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            Response::Replaced(outcome) => !outcome.success,
            Response::RulesApplied { success, .. } => !success,
            Response::Error { .. } | Response::Failure { .. } => true,
            _ => false,
        }
    }
}
