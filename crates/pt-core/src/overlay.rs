//! Display state for extraction results.
//!
//! An [`Overlay`] belongs to the surface that shows results. Each extraction
//! takes a [`Ticket`]; results delivered with an older ticket, or after the
//! overlay was closed, are dropped instead of replacing newer content.

use serde::Serialize;

use crate::message::MessageKind;

/// Identifies one pending extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw value, for surfaces that hand tickets across an FFI boundary.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }
}

/// What the overlay currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OverlayContent {
    Loading {
        #[serde(rename = "sourceUrl")]
        source_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Links { links: Vec<String>, source_url: String },
    Message { text: String, kind: MessageKind },
}

#[derive(Debug)]
pub struct Overlay {
    generation: u64,
    open: bool,
    content: Option<OverlayContent>,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    /// A fresh, open overlay with nothing to show yet.
    pub fn new() -> Self {
        Self {
            generation: 0,
            open: true,
            content: None,
        }
    }

    /// Start a new extraction. Any earlier ticket becomes stale.
    pub fn begin(&mut self, source_url: &str) -> Ticket {
        self.generation += 1;
        self.open = true;
        self.content = Some(OverlayContent::Loading {
            source_url: source_url.to_string(),
        });
        Ticket(self.generation)
    }

    /// Show a result if `ticket` is still current. Returns whether it was shown.
    pub fn deliver(&mut self, ticket: Ticket, content: OverlayContent) -> bool {
        if !self.open || ticket.0 != self.generation {
            log::debug!("Dropping stale overlay result (ticket {})", ticket.0);
            return false;
        }
        self.content = Some(content);
        true
    }

    /// Show a message without an extraction in flight.
    pub fn show_message(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.generation += 1;
        self.open = true;
        self.content = Some(OverlayContent::Message {
            text: text.into(),
            kind,
        });
    }

    /// Close the overlay; pending results will be dropped.
    pub fn close(&mut self) {
        self.open = false;
        self.content = None;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn content(&self) -> Option<&OverlayContent> {
        self.content.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(url: &str) -> OverlayContent {
        OverlayContent::Links {
            links: vec![url.to_string()],
            source_url: "https://src.test/".to_string(),
        }
    }

    #[test]
    fn newer_requests_win() {
        let mut overlay = Overlay::new();
        let first = overlay.begin("https://one.test/");
        let second = overlay.begin("https://two.test/");

        assert!(overlay.deliver(second, links("https://b.test/")));
        assert!(!overlay.deliver(first, links("https://a.test/")));
        assert_eq!(overlay.content(), Some(&links("https://b.test/")));
    }

    #[test]
    fn closed_overlay_ignores_results() {
        let mut overlay = Overlay::new();
        let ticket = overlay.begin("https://one.test/");
        overlay.close();
        assert!(!overlay.deliver(ticket, links("https://a.test/")));
        assert!(overlay.content().is_none());
        assert!(!overlay.is_open());
    }

    #[test]
    fn messages_invalidate_pending_tickets() {
        let mut overlay = Overlay::new();
        let ticket = overlay.begin("https://one.test/");
        overlay.show_message("Domain not permitted", MessageKind::Warning);
        assert!(!overlay.deliver(ticket, links("https://a.test/")));
        assert!(matches!(overlay.content(), Some(OverlayContent::Message { .. })));
    }
}
