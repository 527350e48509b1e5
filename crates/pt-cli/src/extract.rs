use std::fs;
use std::path::Path;

use clap::ValueEnum;

use pt_core::message::MessageKind;
use pt_core::{Dispatcher, ExtractionResult, Overlay, OverlayContent, Request, Response, StorageBackend};
use pt_html::{FetchConfig, HttpLinkSource, LinkExtractor, ParserExtractor, RegexExtractor};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Strategy {
    /// Structural HTML parse
    Parser,
    /// Anchor-tag regex
    Regex,
}

impl Strategy {
    pub fn extractor(self) -> Box<dyn LinkExtractor + Send + Sync> {
        match self {
            Strategy::Parser => Box::new(ParserExtractor::new()),
            Strategy::Regex => Box::new(RegexExtractor::new()),
        }
    }
}

pub type HttpSource = HttpLinkSource<Box<dyn LinkExtractor + Send + Sync>>;

pub fn http_source(strategy: Strategy) -> Result<HttpSource, String> {
    HttpLinkSource::new(&FetchConfig::default(), strategy.extractor()).map_err(|e| e.to_string())
}

/// Scan a local file. No permission check applies to local input.
pub fn extract_file(path: &Path, strategy: Strategy, json: bool) -> Result<(), String> {
    let html = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let source_url = path.display().to_string();

    let mut overlay = Overlay::new();
    let ticket = overlay.begin(&source_url);
    overlay.deliver(
        ticket,
        OverlayContent::Links {
            links: strategy.extractor().extract(&html),
            source_url,
        },
    );
    render(&overlay, json)
}

/// Fetch `url` through the dispatcher, which applies the permitted-domain gate.
pub fn extract_url<B: StorageBackend>(
    dispatcher: &mut Dispatcher<B, HttpSource>,
    url: &str,
    json: bool,
) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;

    let mut overlay = Overlay::new();
    let ticket = overlay.begin(url);
    let response = runtime.block_on(dispatcher.handle_detached(Request::ExtractLinks {
        source_url: url.to_string(),
    }));
    overlay.deliver(ticket, to_content(response));
    render(&overlay, json)
}

fn to_content(response: Response) -> OverlayContent {
    match response {
        Response::Links { links, source_url } => OverlayContent::Links { links, source_url },
        Response::PermissionRequired { message, kind, .. } => OverlayContent::Message { text: message, kind },
        Response::Error { error, .. } => OverlayContent::Message {
            text: error,
            kind: MessageKind::Error,
        },
        Response::Failure { message, .. } => OverlayContent::Message {
            text: message,
            kind: MessageKind::Error,
        },
        other => OverlayContent::Message {
            text: format!("Unexpected response: {:?}", other),
            kind: MessageKind::Error,
        },
    }
}

fn render(overlay: &Overlay, json: bool) -> Result<(), String> {
    match overlay.content() {
        Some(OverlayContent::Links { links, source_url }) => {
            if json {
                let result = ExtractionResult {
                    links: links.clone(),
                    source_url: source_url.clone(),
                };
                let text = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
                println!("{}", text);
            } else if links.is_empty() {
                println!("No links found on {}", source_url);
            } else {
                for link in links {
                    println!("{}", link);
                }
            }
            Ok(())
        }
        Some(OverlayContent::Message { text, kind: MessageKind::Info }) => {
            println!("{}", text);
            Ok(())
        }
        Some(OverlayContent::Message { text, .. }) => Err(text.clone()),
        Some(OverlayContent::Loading { source_url }) => Err(format!("No result for {}", source_url)),
        None => Err("Nothing to show".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_prompts_are_not_link_lists() {
        let content = to_content(Response::PermissionRequired {
            hostname: "a.test".into(),
            message: "Domain \"a.test\" is not permitted.".into(),
            kind: MessageKind::Warning,
        });
        assert!(matches!(content, OverlayContent::Message { kind: MessageKind::Warning, .. }));
    }

    #[test]
    fn fetch_errors_fail_the_command() {
        let mut overlay = Overlay::new();
        let ticket = overlay.begin("https://a.test/");
        overlay.deliver(
            ticket,
            to_content(Response::Error {
                error: "HTTP error 404 (Page Not Found.) when fetching https://a.test/".into(),
                source_url: Some("https://a.test/".into()),
            }),
        );
        assert_eq!(
            render(&overlay, false).unwrap_err(),
            "HTTP error 404 (Page Not Found.) when fetching https://a.test/"
        );
    }

    #[test]
    fn extracts_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, r#"<a href="https://a.test/">a</a>"#).unwrap();
        assert!(extract_file(&path, Strategy::Regex, true).is_ok());
        assert!(extract_file(&dir.path().join("missing.html"), Strategy::Parser, false).is_err());
    }
}
