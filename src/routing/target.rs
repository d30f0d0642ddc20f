//! Target resolution.
//!
//! # Responsibilities
//! - Decide between path mode (`/<encoded-url>`) and params mode
//!   (`/?params=<json>`)
//! - Decode the structured params into a typed value
//! - Give scheme-less targets the relay's own scheme
//! - Carry the inbound query across in path mode only
//!
//! In params mode the query string is the params carrier, so it is not
//! appended to the target.

use std::collections::BTreeMap;

use axum::http::{header::HeaderName, HeaderValue, Uri};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use url::form_urlencoded;

use crate::error::{RelayError, RelayResult};
use crate::routing::inbound::InboundScheme;

/// Query key carrying structured targeting.
pub const PARAMS_KEY: &str = "params";

/// Where a target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Path,
    Params,
}

/// Decoded `params` query value.
#[derive(Debug, Default, Deserialize)]
pub struct TargetParams {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
}

/// Resolved destination of one request.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    url: String,
    header_overrides: Vec<(HeaderName, HeaderValue)>,
    source: TargetSource,
}

impl TargetDescriptor {
    /// Absolute target URL, always with a scheme.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Headers that replace forwarded ones of the same name.
    pub fn header_overrides(&self) -> &[(HeaderName, HeaderValue)] {
        &self.header_overrides
    }

    pub fn source(&self) -> TargetSource {
        self.source
    }
}

/// The raw `params` value, if the query has one.
pub fn params_value(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == PARAMS_KEY)
        .map(|(_, value)| value.into_owned())
}

/// `/` without params is the portal page, not a relay request.
pub fn is_portal_request(uri: &Uri) -> bool {
    uri.path() == "/" && params_value(uri.query()).is_none()
}

/// Resolve the target of an inbound request.
pub fn resolve(uri: &Uri, scheme: InboundScheme) -> RelayResult<TargetDescriptor> {
    match params_value(uri.query()) {
        Some(raw) => resolve_params(&raw, scheme),
        None => resolve_path(uri.path(), uri.query(), scheme),
    }
}

fn resolve_params(raw: &str, scheme: InboundScheme) -> RelayResult<TargetDescriptor> {
    let params: TargetParams =
        serde_json::from_str(raw).map_err(|e| RelayError::InvalidParams(e.to_string()))?;

    let target = params
        .target
        .filter(|t| !t.is_empty())
        .ok_or(RelayError::MissingTarget)?;

    let header_overrides = params
        .headers
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RelayError::InvalidParams(format!("invalid header name '{}'", name)))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| RelayError::InvalidParams(format!("invalid value for header '{}'", name)))?;
            Ok((header_name, header_value))
        })
        .collect::<RelayResult<Vec<_>>>()?;

    Ok(TargetDescriptor {
        url: ensure_scheme(&target, scheme),
        header_overrides,
        source: TargetSource::Params,
    })
}

fn resolve_path(path: &str, query: Option<&str>, scheme: InboundScheme) -> RelayResult<TargetDescriptor> {
    let raw = path.strip_prefix('/').unwrap_or(path);
    if let Some(at) = malformed_escape(raw) {
        return Err(RelayError::MalformedTarget(format!(
            "'%' at byte {} is not followed by two hex digits",
            at
        )));
    }
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| RelayError::MalformedTarget(e.to_string()))?;

    let mut url = ensure_scheme(&decoded, scheme);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    Ok(TargetDescriptor {
        url,
        header_overrides: Vec::new(),
        source: TargetSource::Path,
    })
}

/// Offset of the first `%` that does not start a `%XX` escape.
fn malformed_escape(raw: &str) -> Option<usize> {
    let bytes = raw.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        let well_formed = matches!(
            bytes.get(i + 1..i + 3),
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit()
        );
        (b == b'%' && !well_formed).then_some(i)
    })
}

/// Prefix `candidate` with the relay's scheme unless it already names
/// `http://` or `https://`.
pub fn ensure_scheme(candidate: &str, scheme: InboundScheme) -> String {
    if starts_with_ignore_case(candidate, "http://") || starts_with_ignore_case(candidate, "https://") {
        candidate.to_string()
    } else {
        format!("{}//{}", scheme.protocol(), candidate)
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}
