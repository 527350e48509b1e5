//! PageTools HTML Support
//!
//! This crate scans HTML for outbound links, converts parsed HTML into the
//! engine's [`pt_core::Document`], and fetches pages for the link extractor.
//!
//! Two link extraction strategies produce the same links for well-formed
//! markup: a structural one built on an HTML parser and a regex fallback for
//! environments without one. [`default_extractor`] picks whichever this build
//! supports.

pub mod links;

#[cfg(feature = "html-parser")]
pub mod parse;

#[cfg(feature = "fetch")]
pub mod fetch;

pub use links::{collect_links, default_extractor, extract_links, LinkExtractor, RegexExtractor};

#[cfg(feature = "html-parser")]
pub use links::ParserExtractor;

#[cfg(feature = "html-parser")]
pub use parse::parse_document;

#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, HttpLinkSource};
