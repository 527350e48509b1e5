//! Hostname normalization and the permitted-domain gate
//!
//! The link extractor only fetches pages whose host the user has permitted.
//! A permitted entry covers the host itself and every subdomain of it.
//!
//! # Examples
//!
//! ```
//! use pt_core::domain::is_permitted;
//!
//! let permitted = vec!["example.com".to_string()];
//! assert!(is_permitted("sub.example.com", &permitted));
//! assert!(!is_permitted("example.com.evil.com", &permitted));
//! ```

/// Normalize a hostname for storage and comparison: lowercase, no leading
/// `www.`, no trailing dot.
pub fn normalize_hostname(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator walking a host from itself up to its last two labels.
///
/// The bare top-level label is never yielded, so an entry like `com` cannot
/// permit every `.com` host.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> HostSuffixIter<'a> {
    pub fn new(host: &'a str) -> Self {
        Self {
            current: if host.is_empty() { None } else { Some(host) },
        }
    }
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;

        // Stop once the parent would be a single label
        self.current = get_parent_domain(result).filter(|parent| parent.contains('.'));

        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter::new(host)
}

/// Check whether `hostname` is covered by the permitted list.
///
/// True when the normalized host equals an entry or has an entry as a
/// dot-delimited parent domain. Entries are expected in normalized form, as
/// [`crate::store::DomainStore`] keeps them.
pub fn is_permitted<S: AsRef<str>>(hostname: &str, permitted: &[S]) -> bool {
    if permitted.is_empty() {
        return false;
    }

    let host = normalize_hostname(hostname);
    if host.is_empty() {
        return false;
    }

    let listed = |candidate: &str| permitted.iter().any(|entry| entry.as_ref() == candidate);

    // A single-label host may only match itself
    if listed(&host) {
        return true;
    }

    walk_host_suffixes(&host).skip(1).any(listed)
}
