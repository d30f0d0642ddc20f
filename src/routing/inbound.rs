//! How the relay itself was reached.
//!
//! Rewritten links and scheme-less targets need the scheme and host the
//! client used to talk to the relay. Forwarded headers are only consulted
//! when the listener is configured to trust them.

use axum::http::{header, HeaderMap, Uri};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Scheme of the inbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundScheme {
    Http,
    Https,
}

impl InboundScheme {
    /// Scheme with its trailing colon, e.g. `https:`.
    pub fn protocol(&self) -> &'static str {
        match self {
            InboundScheme::Http => "http:",
            InboundScheme::Https => "https:",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Some(InboundScheme::Http),
            "https" => Some(InboundScheme::Https),
            _ => None,
        }
    }
}

/// Scheme and host under which the client sees the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundContext {
    pub scheme: InboundScheme,
    pub host: String,
}

impl InboundContext {
    pub fn new(scheme: InboundScheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
        }
    }

    /// Work out the context from request parts.
    ///
    /// `listener_scheme` is what the socket speaks; `fallback_host` is used
    /// when the request names no host at all.
    pub fn from_request(
        uri: &Uri,
        headers: &HeaderMap,
        listener_scheme: InboundScheme,
        trust_forwarded: bool,
        fallback_host: &str,
    ) -> Self {
        let forwarded = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                // Only the first hop counts.
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let scheme = trust_forwarded
            .then(|| forwarded(X_FORWARDED_PROTO).and_then(InboundScheme::from_name))
            .flatten()
            .or_else(|| uri.scheme_str().and_then(InboundScheme::from_name))
            .unwrap_or(listener_scheme);

        let host = trust_forwarded
            .then(|| forwarded(X_FORWARDED_HOST))
            .flatten()
            .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .unwrap_or(fallback_host);

        Self::new(scheme, host)
    }
}
