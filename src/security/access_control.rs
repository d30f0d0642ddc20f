//! Destination allow-list.
//!
//! A hostname is permitted when it equals an entry or is a subdomain of
//! one. An empty list permits every host. A target that does not parse as
//! a URL with a host is always refused.

use url::Url;

/// Why a destination was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The target is not a URL with a hostname.
    InvalidTargetUrl(String),
    /// The hostname matched no entry.
    NotListed(String),
}

/// Ordered set of lowercase domain suffixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    domains: Vec<String>,
}

impl AllowList {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list, e.g. `"example.com, GitHub.com"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Check a hostname against the list.
    pub fn allows_host(&self, host: &str) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        let host = host.to_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Check a fully resolved target URL.
    pub fn check(&self, target: &str) -> Result<(), Denial> {
        let url = Url::parse(target).map_err(|e| Denial::InvalidTargetUrl(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| Denial::InvalidTargetUrl("target has no host".to_string()))?;

        if self.allows_host(host) {
            Ok(())
        } else {
            Err(Denial::NotListed(host.to_string()))
        }
    }
}
