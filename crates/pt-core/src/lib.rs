//! PageTools Core Library
//!
//! This crate provides the engine shared by the PageTools browser extensions:
//! the text replacer (saved per-domain find/replace rules) and the link
//! extractor (lists the outbound links of a hyperlink's target page).
//!
//! # Architecture
//!
//! Platform services (extension storage, the page DOM, network fetches) are
//! reached through narrow traits so the same engine runs inside the extension
//! through the wasm bindings and on the command line:
//!
//! - [`store::StorageBackend`] for persisted rule and domain lists
//! - [`dom::DomTree`] for the document a rule is applied to
//! - [`dispatch::LinkSource`] for fetching and scanning a target page
//!
//! # Modules
//!
//! - `types`: Rule records, drafts and extraction results
//! - `url`: Allocation-free scheme/host helpers
//! - `domain`: Hostname normalization and the permitted-domain gate
//! - `dom`: Document tree abstraction and an in-memory implementation
//! - `matcher`: Regex-or-literal substitution over text nodes and attributes
//! - `selector`: Per-hostname rule selection
//! - `store`: Rule and domain stores over a storage backend
//! - `message`: Wire requests and responses
//! - `dispatch`: Routes requests to the matching engine or a link source
//! - `overlay`: Display state for extracted links with stale-result rejection

pub mod dispatch;
pub mod dom;
pub mod domain;
pub mod error;
pub mod matcher;
pub mod message;
pub mod overlay;
pub mod selector;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use dispatch::{Dispatcher, LinkSource, PageContext};
pub use dom::{Document, DomTree, NodeId, NodeKind};
pub use domain::{is_permitted, normalize_hostname};
pub use error::{Error, FetchError};
pub use matcher::{apply, apply_rule, apply_rules, MatchEngine};
pub use message::{Request, Response};
pub use overlay::{Overlay, OverlayContent, Ticket};
pub use selector::select_applicable;
pub use store::{DomainStore, MemoryBackend, RuleStore, StorageBackend};
pub use types::{ExtractionResult, ReplacementRule, RuleDraft, TagSelector};
