//! Header filtering and response header policy.
//!
//! # Responsibilities
//! - Decide which inbound headers travel to the origin
//! - Strip hop-by-hop headers in both directions
//! - Stamp the no-cache and CORS headers on every client response

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

/// Headers bound to a single connection. They are recomputed by the
/// transport on each side and never copied across.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

pub const CACHE_CONTROL_VALUE: &str = "no-store";
pub const ALLOW_ORIGIN_VALUE: &str = "*";
pub const ALLOW_METHODS_VALUE: &str = "GET, POST, PUT, DELETE";
pub const ALLOW_HEADERS_VALUE: &str = "*";

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Predicate selecting the inbound headers that may be forwarded.
///
/// `host` always goes: the origin's host comes from the target URL.
/// `accept-encoding` goes too; the outbound client advertises only the
/// codings it can decode.
pub fn is_forwardable(name: &HeaderName, reserved_prefix: Option<&str>) -> bool {
    if name == header::HOST || name == header::ACCEPT_ENCODING || is_hop_by_hop(name) {
        return false;
    }
    match reserved_prefix {
        // Header names are stored lowercase.
        Some(prefix) => !name.as_str().starts_with(&prefix.to_ascii_lowercase()),
        None => true,
    }
}

/// Inbound headers in arrival order, minus everything the predicate rejects.
pub fn forwardable_headers(
    headers: &HeaderMap,
    reserved_prefix: Option<&str>,
) -> Vec<(HeaderName, HeaderValue)> {
    headers
        .iter()
        .filter(|(name, _)| is_forwardable(name, reserved_prefix))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forwarded headers with overrides laid on top. An override replaces every
/// forwarded value of the same name.
pub fn merge_overrides(
    forwarded: Vec<(HeaderName, HeaderValue)>,
    overrides: &[(HeaderName, HeaderValue)],
) -> HeaderMap {
    let mut merged = HeaderMap::with_capacity(forwarded.len() + overrides.len());
    for (name, value) in forwarded {
        merged.append(name, value);
    }
    for (name, value) in overrides {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Disable caching and open CORS, overwriting anything the origin sent.
pub fn apply_client_policy(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN_VALUE),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS_VALUE),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS_VALUE),
    );
}
