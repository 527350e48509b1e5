use std::fs;
use std::path::Path;

use pt_core::{Dispatcher, Document, LinkSource, PageContext, Request, Response, StorageBackend};
use pt_html::parse_document;

pub fn read_page(path: &Path) -> Result<Document, String> {
    let html = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    Ok(parse_document(&html))
}

/// Write the edited page to `output`, or stdout when none is given.
pub fn write_page(doc: &Document, output: Option<&Path>) -> Result<(), String> {
    let html = doc.to_html();
    match output {
        Some(path) => fs::write(path, html).map_err(|e| format!("Failed to write '{}': {}", path.display(), e)),
        None => {
            println!("{}", html);
            Ok(())
        }
    }
}

/// Run a page request against `doc`, returning the response or its failure text.
pub fn run_on_page<B, L>(
    dispatcher: &mut Dispatcher<B, L>,
    request: Request,
    hostname: &str,
    doc: &mut Document,
) -> Result<Response, String>
where
    B: StorageBackend,
    L: LinkSource,
{
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;
    let response = runtime.block_on(dispatcher.handle(request, Some(PageContext::new(hostname, doc))));
    crate::check(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_page_is_reported() {
        let err = read_page(Path::new("/definitely/not/here.html")).unwrap_err();
        assert!(err.starts_with("Failed to read '/definitely/not/here.html'"));
    }

    #[test]
    fn writes_edited_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.html");
        let output = dir.path().join("out.html");
        fs::write(&input, "<p>old</p>").unwrap();

        let doc = read_page(&input).unwrap();
        write_page(&doc, Some(&output)).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "<html><head></head><body><p>old</p></body></html>"
        );
    }
}
