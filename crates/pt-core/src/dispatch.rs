//! Request dispatcher
//!
//! Routes a [`Request`] from a UI surface to where it runs: the matching
//! engine for the current page, the stores for options/popup actions, or a
//! [`LinkSource`] for link extraction. Every failure is turned into a
//! [`Response`]; nothing escapes [`Dispatcher::handle`].

use ::url::Url;
use log::{debug, warn};

use crate::dom::{Document, DomTree};
use crate::error::FetchError;
use crate::matcher::{apply, apply_rules};
use crate::message::{MessageKind, Request, Response};
use crate::store::{DomainStore, RuleStore, StorageBackend};
use crate::types::{ExtractionResult, ReplacementRule};

/// Fetches a page and lists its links.
#[allow(async_fn_in_trait)]
pub trait LinkSource {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, FetchError>;
}

/// The page a request runs against.
pub struct PageContext<'a, T> {
    pub hostname: &'a str,
    pub tree: &'a mut T,
}

impl<'a, T: DomTree> PageContext<'a, T> {
    pub fn new(hostname: &'a str, tree: &'a mut T) -> Self {
        Self { hostname, tree }
    }
}

const NO_PAGE: &str = "No active tab found";

/// Routes requests to the engine, the stores or a link source.
pub struct Dispatcher<B, L> {
    backend: B,
    links: L,
}

impl<B: StorageBackend, L: LinkSource> Dispatcher<B, L> {
    pub fn new(backend: B, links: L) -> Self {
        Self { backend, links }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn rules(&mut self) -> RuleStore<&mut B> {
        RuleStore::new(&mut self.backend)
    }

    pub fn domains(&mut self) -> DomainStore<&mut B> {
        DomainStore::new(&mut self.backend)
    }

    /// Handle a request that does not target a page.
    pub async fn handle_detached(&mut self, request: Request) -> Response {
        self.handle::<Document>(request, None).await
    }

    /// Handle a request. Page actions without a page fail with a message.
    pub async fn handle<T: DomTree>(
        &mut self,
        request: Request,
        page: Option<PageContext<'_, T>>,
    ) -> Response {
        debug!("Dispatching {}", request.action());

        match request {
            Request::ReplaceText {
                tag_selector,
                find_pattern,
                replacement,
                use_regex,
            } => {
                let Some(page) = page else {
                    return Response::failure(NO_PAGE);
                };
                let mut rule = ReplacementRule::ad_hoc(&tag_selector, &find_pattern, &replacement);
                rule.use_regex = use_regex.unwrap_or(true);
                Response::Replaced(apply(&rule, page.tree))
            }
            Request::ApplyAllRules => match page {
                Some(page) => self.apply_all(page),
                None => Response::failure(NO_PAGE),
            },
            Request::ExtractLinks { source_url } => self.extract_links(&source_url).await,
            Request::AddDomain { domain } => match self.domains().add(&domain) {
                Ok((status, domain)) => Response::DomainAdded { status, domain },
                Err(e) => Response::failure(e.to_string()),
            },
            Request::RemoveDomain { domain } => match self.domains().remove(&domain) {
                Ok(removed) => Response::DomainRemoved { removed, domain },
                Err(e) => Response::failure(e.to_string()),
            },
            Request::SaveRule { rule } => match self.rules().add(rule) {
                Ok(rule) => Response::RuleSaved { success: true, rule },
                Err(e) => Response::failure(e.to_string()),
            },
            Request::ToggleRule { id } => match self.rules().toggle(&id) {
                Ok(rule) => Response::RuleToggled {
                    success: true,
                    id: rule.id,
                    enabled: rule.enabled,
                },
                Err(e) => Response::failure(e.to_string()),
            },
            Request::DeleteRule { id } => match self.rules().delete(&id) {
                Ok(()) => Response::RuleDeleted { success: true, id },
                Err(e) => Response::failure(e.to_string()),
            },
        }
    }

    fn apply_all<T: DomTree>(&mut self, page: PageContext<'_, T>) -> Response {
        let PageContext { hostname, tree } = page;
        let rules = match self.rules().applicable(hostname) {
            Ok(rules) => rules,
            Err(e) => return Response::failure(e.to_string()),
        };

        let count = apply_rules(&rules, tree);
        debug!("Applied {} rule(s) on {}", rules.len(), hostname);
        Response::rules_applied(count, rules.len())
    }

    async fn extract_links(&mut self, source_url: &str) -> Response {
        // The gate must see the host the fetch will actually contact
        let Some(url) = parse_fetch_url(source_url) else {
            return Response::Error {
                error: format!("Error processing link: invalid URL {}", source_url),
                source_url: Some(source_url.to_string()),
            };
        };
        let Some(hostname) = url.host_str() else {
            return Response::failure(format!("Error processing link: no host in {}", source_url));
        };

        match self.domains().is_permitted(hostname) {
            Ok(true) => {}
            Ok(false) => {
                return Response::PermissionRequired {
                    hostname: hostname.to_string(),
                    message: format!(
                        "Domain \"{}\" is not permitted. Please add it via the extension popup to extract links.",
                        hostname
                    ),
                    kind: MessageKind::Warning,
                };
            }
            Err(e) => return Response::failure(e.to_string()),
        }

        match self.links.extract(url.as_str()).await {
            Ok(result) => {
                debug!("Extracted {} links from {}", result.links.len(), source_url);
                Response::Links {
                    links: result.links,
                    source_url: result.source_url,
                }
            }
            Err(e) => {
                warn!("Link extraction failed: {}", e);
                Response::Error {
                    error: e.to_string(),
                    source_url: Some(source_url.to_string()),
                }
            }
        }
    }
}

/// Parse a link target the way the HTTP client will. Only http(s) URLs pass.
fn parse_fetch_url(source_url: &str) -> Option<Url> {
    let url = Url::parse(source_url.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
