use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pt_core::message::{AddStatus, MessageKind, ReplaceOutcome};
use pt_core::{
    Dispatcher, Document, DomTree, ExtractionResult, FetchError, LinkSource, MemoryBackend, NodeId,
    PageContext, Request, Response, RuleDraft,
};

/// Serves canned results and records the URLs it was asked for.
struct FakeSource {
    requested: Rc<Cell<usize>>,
    last_url: Rc<RefCell<Option<String>>>,
    fail_with: Option<u16>,
}

impl FakeSource {
    fn ok() -> Self {
        Self {
            requested: Rc::new(Cell::new(0)),
            last_url: Rc::default(),
            fail_with: None,
        }
    }

    fn failing(status: u16) -> Self {
        Self { fail_with: Some(status), ..Self::ok() }
    }
}

impl LinkSource for FakeSource {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, FetchError> {
        self.requested.set(self.requested.get() + 1);
        *self.last_url.borrow_mut() = Some(url.to_string());
        if let Some(status) = self.fail_with {
            return Err(FetchError::from_status(url, status, "Nope"));
        }
        Ok(ExtractionResult {
            links: vec!["https://a.test/".into(), "https://b.test/".into()],
            source_url: url.to_string(),
        })
    }
}

fn page() -> (Document, NodeId, NodeId) {
    let mut doc = Document::new();
    let root = doc.root();
    let body = doc.append_element(root, "body", Vec::<(&str, &str)>::new());
    let p1 = doc.append_element(body, "p", Vec::<(&str, &str)>::new());
    let t1 = doc.append_text(p1, "a cat sat");
    let p2 = doc.append_element(body, "p", Vec::<(&str, &str)>::new());
    let t2 = doc.append_text(p2, "no match");
    (doc, t1, t2)
}

#[tokio::test]
async fn replace_text_reports_count() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::ok());
    let (mut doc, t1, t2) = page();

    let response = dispatcher
        .handle(
            Request::ReplaceText {
                tag_selector: "p".into(),
                find_pattern: "cat".into(),
                replacement: "dog".into(),
                use_regex: None,
            },
            Some(PageContext::new("example.com", &mut doc)),
        )
        .await;

    assert_eq!(response, Response::Replaced(ReplaceOutcome::matched(1)));
    assert_eq!(doc.text(&t1).as_deref(), Some("a dog sat"));
    assert_eq!(doc.text(&t2).as_deref(), Some("no match"));
}

#[tokio::test]
async fn page_actions_need_a_page() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::ok());
    let response = dispatcher.handle_detached(Request::ApplyAllRules).await;
    assert!(response.is_failure());
}

#[tokio::test]
async fn applies_saved_rules_for_the_page_host() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::ok());
    for draft in [
        RuleDraft::new("p", "cat", "dog", "example.com"),
        RuleDraft::new("p", "sat", "stood", ""),
        RuleDraft::new("p", "no", "yes", "other.com"),
    ] {
        let saved = dispatcher.handle_detached(Request::SaveRule { rule: draft }).await;
        assert!(matches!(saved, Response::RuleSaved { success: true, .. }));
    }

    let (mut doc, t1, t2) = page();
    let response = dispatcher
        .handle(Request::ApplyAllRules, Some(PageContext::new("www.example.com", &mut doc)))
        .await;

    match response {
        Response::RulesApplied { count, rules_applied, .. } => {
            assert_eq!(rules_applied, 2);
            assert_eq!(count, 2);
        }
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(doc.text(&t1).as_deref(), Some("a dog stood"));
    assert_eq!(doc.text(&t2).as_deref(), Some("no match"));
}

#[tokio::test]
async fn toggled_and_deleted_rules_stop_applying() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::ok());
    let id = match dispatcher
        .handle_detached(Request::SaveRule {
            rule: RuleDraft::new("p", "cat", "dog", "example.com"),
        })
        .await
    {
        Response::RuleSaved { rule, .. } => rule.id,
        other => panic!("unexpected response: {other:?}"),
    };

    let toggled = dispatcher.handle_detached(Request::ToggleRule { id: id.clone() }).await;
    assert!(matches!(toggled, Response::RuleToggled { enabled: false, .. }));
    assert!(dispatcher.rules().applicable("example.com").unwrap().is_empty());

    dispatcher.handle_detached(Request::ToggleRule { id: id.clone() }).await;
    let deleted = dispatcher.handle_detached(Request::DeleteRule { id: id.clone() }).await;
    assert_eq!(deleted, Response::RuleDeleted { success: true, id: id.clone() });
    assert!(dispatcher.rules().list().unwrap().is_empty());
    assert!(dispatcher.rules().applicable("example.com").unwrap().is_empty());

    let again = dispatcher.handle_detached(Request::DeleteRule { id }).await;
    assert!(again.is_failure());
}

#[tokio::test]
async fn extraction_is_gated_by_permitted_domains() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::ok());

    let denied = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "https://news.example.com/story".into(),
        })
        .await;
    match denied {
        Response::PermissionRequired { hostname, kind, .. } => {
            assert_eq!(hostname, "news.example.com");
            assert_eq!(kind, MessageKind::Warning);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    let added = dispatcher
        .handle_detached(Request::AddDomain { domain: "www.example.com".into() })
        .await;
    assert_eq!(
        added,
        Response::DomainAdded { status: AddStatus::Success, domain: "example.com".into() }
    );

    let allowed = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "https://news.example.com/story".into(),
        })
        .await;
    assert_eq!(
        allowed,
        Response::Links {
            links: vec!["https://a.test/".into(), "https://b.test/".into()],
            source_url: "https://news.example.com/story".into(),
        }
    );

    let lookalike = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "https://example.com.evil.com/".into(),
        })
        .await;
    assert!(matches!(lookalike, Response::PermissionRequired { .. }));
}

#[tokio::test]
async fn fetch_failures_become_error_messages() {
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), FakeSource::failing(404));
    dispatcher.domains().add("example.com").unwrap();

    let response = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "https://example.com/missing".into(),
        })
        .await;

    assert_eq!(
        response,
        Response::Error {
            error: "HTTP error 404 (Page Not Found.) when fetching https://example.com/missing".into(),
            source_url: Some("https://example.com/missing".into()),
        }
    );
}

#[tokio::test]
async fn invalid_urls_do_not_reach_the_source() {
    let source = FakeSource::ok();
    let requested = Rc::clone(&source.requested);
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), source);
    dispatcher.domains().add("example.com").unwrap();

    for url in ["not a url", "ftp://example.com/file", "javascript:alert(1)", "https://"] {
        let response = dispatcher
            .handle_detached(Request::ExtractLinks { source_url: url.into() })
            .await;
        assert!(response.is_failure(), "{url} should be rejected");
    }
    assert_eq!(requested.get(), 0);
}

#[tokio::test]
async fn gate_checks_the_host_that_will_be_fetched() {
    let source = FakeSource::ok();
    let requested = Rc::clone(&source.requested);
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), source);
    dispatcher.domains().add("example.com").unwrap();

    // WHATWG parsing treats '\\' as a path separator: the real host is evil.test
    let response = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "https://evil.test\\@example.com/".into(),
        })
        .await;
    match response {
        Response::PermissionRequired { hostname, .. } => assert_eq!(hostname, "evil.test"),
        other => panic!("unexpected response: {other:?}"),
    }
    assert_eq!(requested.get(), 0);
}

#[tokio::test]
async fn source_receives_the_parsed_url() {
    let source = FakeSource::ok();
    let last_url = Rc::clone(&source.last_url);
    let mut dispatcher = Dispatcher::new(MemoryBackend::new(), source);
    dispatcher.domains().add("example.com").unwrap();

    let response = dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "HTTPS://News.Example.com/a b".into(),
        })
        .await;
    assert!(matches!(response, Response::Links { .. }));
    assert_eq!(
        last_url.borrow().as_deref(),
        Some("https://news.example.com/a%20b")
    );

    dispatcher
        .handle_detached(Request::ExtractLinks {
            source_url: "http://[::1]:8080/".into(),
        })
        .await;
    assert_eq!(last_url.borrow().as_deref(), Some("https://news.example.com/a%20b"));
}
