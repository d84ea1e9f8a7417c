//! URL Validator
//!
//! Admission precondition: the URL must have a hostname that is not on the
//! domain blocklist. A blocked domain also blocks all of its subdomains.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use reqwest::Url;
use thiserror::Error;

/// Domains blocked when no explicit list is configured.
pub const DEFAULT_BLOCKLIST: &[&str] = &["facebook.com", "example-bad.com"];

// == Validation Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid or missing hostname")]
    MissingHost,

    #[error("blocked domain ({0})")]
    Blocked(String),
}

// == Validator ==
/// Process-scoped blocklist behind its own lock.
#[derive(Debug, Default)]
pub struct Validator {
    blocklist: RwLock<BTreeSet<String>>,
}

impl Validator {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocklist = domains
            .into_iter()
            .map(|d| normalize_host(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            blocklist: RwLock::new(blocklist),
        }
    }

    // == Is Allowed ==
    /// Accepts `url` unless its host is missing or blocked.
    pub fn is_allowed(&self, url: &str) -> Result<(), ValidationError> {
        let host = extract_hostname(url).ok_or(ValidationError::MissingHost)?;
        match self.blocked_by(&host) {
            Some(domain) => Err(ValidationError::Blocked(domain)),
            None => Ok(()),
        }
    }

    /// Returns the blocklist entry that matches `host`, if any.
    fn blocked_by(&self, host: &str) -> Option<String> {
        let host = normalize_host(host);
        self.blocklist
            .read()
            .iter()
            .find(|bad| host == **bad || host.ends_with(&format!(".{}", bad)))
            .cloned()
    }

    // == Blocklist Management ==
    /// Sorted copy of the blocklist.
    pub fn blocklist(&self) -> Vec<String> {
        self.blocklist.read().iter().cloned().collect()
    }

    /// Returns false if `domain` is empty or already listed.
    pub fn add(&self, domain: &str) -> bool {
        let domain = normalize_host(domain);
        !domain.is_empty() && self.blocklist.write().insert(domain)
    }

    /// Returns false if `domain` was not listed.
    pub fn remove(&self, domain: &str) -> bool {
        let domain = normalize_host(domain);
        !domain.is_empty() && self.blocklist.write().remove(&domain)
    }
}

/// Lowercases and strips one trailing dot.
fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn extract_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(DEFAULT_BLOCKLIST.iter().copied())
    }

    #[test]
    fn test_allows_ordinary_url() {
        assert_eq!(validator().is_allowed("https://example.com/a.css"), Ok(()));
    }

    #[test]
    fn test_rejects_missing_host() {
        let v = validator();
        assert_eq!(v.is_allowed("not a url"), Err(ValidationError::MissingHost));
        assert_eq!(v.is_allowed("file:///etc/passwd"), Err(ValidationError::MissingHost));
        assert_eq!(v.is_allowed(""), Err(ValidationError::MissingHost));
    }

    #[test]
    fn test_blocks_domain_and_subdomains() {
        let v = validator();
        assert_eq!(
            v.is_allowed("https://facebook.com/"),
            Err(ValidationError::Blocked("facebook.com".to_string()))
        );
        assert_eq!(
            v.is_allowed("https://m.FACEBOOK.com./feed"),
            Err(ValidationError::Blocked("facebook.com".to_string()))
        );
        assert_eq!(v.is_allowed("https://notfacebook.com/"), Ok(()));
    }

    #[test]
    fn test_add_and_remove() {
        let v = Validator::default();

        assert!(v.add("Tracker.IO."));
        assert!(!v.add("tracker.io"));
        assert!(!v.add("  "));
        assert_eq!(v.blocklist(), vec!["tracker.io"]);
        assert!(v.is_allowed("http://ads.tracker.io/x").is_err());

        assert!(v.remove("tracker.io"));
        assert!(!v.remove("tracker.io"));
        assert!(v.is_allowed("http://ads.tracker.io/x").is_ok());
    }

    #[test]
    fn test_blocklist_is_sorted() {
        let v = Validator::new(["zeta.com", "alpha.com", "mid.com"]);
        assert_eq!(v.blocklist(), vec!["alpha.com", "mid.com", "zeta.com"]);
    }
}
