//! Error types shared across the engine.

/// Errors raised by stores, the DOM layer and rule validation.
///
/// Public operations of the matching engine and the dispatcher never return
/// these directly; they are folded into failure responses at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Please enter a tag name")]
    MissingTagSelector,
    #[error("Please enter text to find")]
    MissingFindPattern,
    #[error("Rule not found: {0}")]
    RuleNotFound(String),
    #[error("Invalid domain: {0:?}")]
    InvalidDomain(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("DOM operation failed: {0}")]
    Dom(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Malformed stored data under '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Fetch Errors
// =============================================================================

const FORBIDDEN_DETAIL: &str = "Access Forbidden. The server denied access to this URL.";
const NOT_FOUND_DETAIL: &str = "Page Not Found.";
const NETWORK_DETAIL: &str =
    "Network error or CORS issue. The extension might not have permission to access this URL directly.";

/// Failure to fetch a link extractor's source page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("HTTP error {} ({}) when fetching {}", self.status(), self.detail(), self.url())]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },
    /// The request never produced a response (DNS, TLS, refused, opaque).
    #[error("HTTP error {} ({}) when fetching {}", self.status(), self.detail(), self.url())]
    Network { url: String, reason: String },
}

impl FetchError {
    /// Build a failure from an HTTP status. Status 0 is what an opaque or
    /// blocked cross-origin response reports and is treated as a network error.
    pub fn from_status(url: &str, status: u16, status_text: &str) -> Self {
        if status == 0 {
            return Self::Network {
                url: url.to_string(),
                reason: status_text.to_string(),
            };
        }
        Self::Status {
            url: url.to_string(),
            status,
            status_text: status_text.to_string(),
        }
    }

    pub fn network(url: &str, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status, 0 for network failures.
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
            Self::Network { .. } => 0,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Network { url, .. } => url,
        }
    }

    /// Human-readable reason classified by status.
    pub fn detail(&self) -> &str {
        match self {
            Self::Network { .. } => NETWORK_DETAIL,
            Self::Status { status: 403, .. } => FORBIDDEN_DETAIL,
            Self::Status { status: 404, .. } => NOT_FOUND_DETAIL,
            Self::Status { status_text, .. } => status_text,
        }
    }
}
