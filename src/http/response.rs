//! Response handling and transformation.
//!
//! # Responsibilities
//! - Route redirects back through the relay by re-encoding `Location`
//! - Point root-relative HTML links at the relay
//! - Drop hop-by-hop headers, disable caching, open CORS
//!
//! # Design Decisions
//! - Only HTML bodies are buffered; everything else streams through
//! - Link rewriting is textual, not an HTML parse: `href="/x"` inside a
//!   script or comment is rewritten too, and unquoted attributes are not
//! - Relative `Location` values are resolved against the target URL

use std::sync::LazyLock;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use url::Url;

use crate::error::{RelayError, RelayResult};
use crate::routing::InboundContext;
use crate::security::headers::{apply_client_policy, strip_hop_by_hop};

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static ROOT_RELATIVE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:href|src|action)=["']/"#).expect("link pattern is a valid regex")
});

/// How a response will be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Redirect,
    Html,
    Passthrough,
}

impl ResponseKind {
    /// Metrics label.
    pub fn outcome(&self) -> &'static str {
        match self {
            ResponseKind::Redirect => "redirect",
            ResponseKind::Html => "html",
            ResponseKind::Passthrough => "forwarded",
        }
    }
}

pub fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
}

/// Whether the body still carries a content coding the client did not
/// undo, e.g. one an explicit `Accept-Encoding` override asked for.
pub fn is_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|coding| !coding.trim().eq_ignore_ascii_case("identity"))
}

/// Encoded HTML is passed through unchanged.
pub fn classify(status: StatusCode, headers: &HeaderMap) -> ResponseKind {
    if is_redirect(status) {
        ResponseKind::Redirect
    } else if is_html(headers) && !is_encoded(headers) {
        ResponseKind::Html
    } else {
        ResponseKind::Passthrough
    }
}

/// Transform an origin response for the client.
pub async fn rewrite(
    response: Response<Body>,
    inbound: &InboundContext,
    target_url: &str,
) -> RelayResult<Response<Body>> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);

    let body = match classify(parts.status, &parts.headers) {
        ResponseKind::Redirect => {
            rewrite_location(&mut parts.headers, target_url)?;
            body
        }
        ResponseKind::Html => {
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|e| RelayError::Rewrite(format!("failed to read origin body: {}", e)))?;
            let origin = target_origin(target_url)?;
            let text = String::from_utf8_lossy(&bytes);

            parts.headers.remove(header::CONTENT_LENGTH);
            Body::from(rewrite_html(&text, inbound, &origin))
        }
        ResponseKind::Passthrough => body,
    };

    apply_client_policy(&mut parts.headers);
    Ok(Response::from_parts(parts, body))
}

/// Replace `Location` with `/` + the percent-encoded absolute location.
///
/// A response without `Location` is left alone.
pub fn rewrite_location(headers: &mut HeaderMap, target_url: &str) -> RelayResult<()> {
    let Some(value) = headers.get(header::LOCATION) else {
        return Ok(());
    };
    let raw = value
        .to_str()
        .map_err(|_| RelayError::Rewrite("redirect location is not valid text".to_string()))?;

    let base = Url::parse(target_url)
        .map_err(|e| RelayError::Rewrite(format!("invalid target URL '{}': {}", target_url, e)))?;
    let absolute = base
        .join(raw)
        .map_err(|e| RelayError::Rewrite(format!("invalid redirect location '{}': {}", raw, e)))?;

    let encoded = format!("/{}", encode_component(absolute.as_str()));
    let value = HeaderValue::from_str(&encoded)
        .map_err(|e| RelayError::Rewrite(format!("unusable redirect location: {}", e)))?;
    headers.insert(header::LOCATION, value);
    Ok(())
}

/// Percent-encode like `encodeURIComponent`.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// `scheme://host[:port]` of the target.
pub fn target_origin(target_url: &str) -> RelayResult<String> {
    Url::parse(target_url)
        .map(|url| url.origin().ascii_serialization())
        .map_err(|e| RelayError::Rewrite(format!("invalid target URL '{}': {}", target_url, e)))
}

/// Rewrite `href="/…"`, `src="/…"` and `action="/…"` (either quote) to go
/// through the relay. Protocol-relative `//…` links are left as they are.
pub fn rewrite_html(text: &str, inbound: &InboundContext, origin: &str) -> String {
    let replacement = format!("{}//{}/{}/", inbound.scheme.protocol(), inbound.host, origin);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in ROOT_RELATIVE_LINK.find_iter(text) {
        if text.as_bytes().get(found.end()) == Some(&b'/') {
            continue;
        }
        // Keep the attribute and its quote, swap the leading slash.
        out.push_str(&text[last..found.end() - 1]);
        out.push_str(&replacement);
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::InboundScheme;
    use percent_encoding::percent_decode_str;

    fn relay() -> InboundContext {
        InboundContext::new(InboundScheme::Http, "relay.test:8080")
    }

    fn origin_response(status: u16, headers: &[(&'static str, &'static str)], body: &'static str) -> Response<Body> {
        let mut builder = Response::builder().status(status);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_html_links_rewritten() {
        let html = r#"<a href="/foo">x</a><img src='/img.png'><form action='/submit'>"#;
        let out = rewrite_html(html, &relay(), "https://example.com");
        assert_eq!(
            out,
            r#"<a href="http://relay.test:8080/https://example.com/foo">x</a><img src='http://relay.test:8080/https://example.com/img.png'><form action='http://relay.test:8080/https://example.com/submit'>"#
        );
    }

    #[test]
    fn test_protocol_relative_and_absolute_links_untouched() {
        let html = r#"<a href="//cdn.example.com/x"><a href="https://other.com/"><a href="rel/path"><a HREF="/upper">"#;
        assert_eq!(rewrite_html(html, &relay(), "https://example.com"), html);
    }

    #[test]
    fn test_root_link_and_trailing_match() {
        let out = rewrite_html(r#"<a href="/">home</a> src="/"#, &relay(), "http://a.com");
        assert_eq!(
            out,
            r#"<a href="http://relay.test:8080/http://a.com/">home</a> src="http://relay.test:8080/http://a.com/"#
        );
    }

    #[test]
    fn test_textual_rewrite_reaches_into_scripts() {
        let html = r#"<script>el.innerHTML = '<a href="/in-script">';</script>"#;
        let out = rewrite_html(html, &relay(), "http://a.com");
        assert!(out.contains(r#"href="http://relay.test:8080/http://a.com/in-script""#));
    }

    #[test]
    fn test_encode_component_matches_uri_component() {
        assert_eq!(
            encode_component("https://a.com/p?q=1&r=a b#f"),
            "https%3A%2F%2Fa.com%2Fp%3Fq%3D1%26r%3Da%20b%23f"
        );
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
    }

    #[test]
    fn test_location_round_trips_for_every_redirect_status() {
        for status in [301u16, 302, 303, 307, 308] {
            assert!(is_redirect(StatusCode::from_u16(status).unwrap()));
            let mut headers = HeaderMap::new();
            headers.insert(
                header::LOCATION,
                HeaderValue::from_static("https://next.example.com/a/b?x=1&y=%20z"),
            );
            rewrite_location(&mut headers, "https://example.com/start").unwrap();

            let rewritten = headers[header::LOCATION].to_str().unwrap();
            let decoded = percent_decode_str(rewritten.strip_prefix('/').unwrap())
                .decode_utf8()
                .unwrap();
            assert_eq!(decoded, "https://next.example.com/a/b?x=1&y=%20z");
        }
        assert!(!is_redirect(StatusCode::NOT_MODIFIED));
    }

    #[test]
    fn test_relative_location_resolved_against_target() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/next"));
        rewrite_location(&mut headers, "http://origin.test:9000/page?x=1").unwrap();
        assert_eq!(headers[header::LOCATION], "/http%3A%2F%2Forigin.test%3A9000%2Fnext");
    }

    #[test]
    fn test_missing_location_left_alone() {
        let mut headers = HeaderMap::new();
        rewrite_location(&mut headers, "http://a.com/").unwrap();
        assert!(headers.get(header::LOCATION).is_none());
    }

    #[test]
    fn test_classify() {
        let mut html = HeaderMap::new();
        html.insert(header::CONTENT_TYPE, HeaderValue::from_static("Text/HTML; charset=utf-8"));
        assert_eq!(classify(StatusCode::OK, &html), ResponseKind::Html);
        assert_eq!(classify(StatusCode::FOUND, &html), ResponseKind::Redirect);
        assert_eq!(classify(StatusCode::OK, &HeaderMap::new()), ResponseKind::Passthrough);

        html.insert(header::CONTENT_ENCODING, HeaderValue::from_static("zstd"));
        assert_eq!(classify(StatusCode::OK, &html), ResponseKind::Passthrough);
        html.insert(header::CONTENT_ENCODING, HeaderValue::from_static("identity"));
        assert_eq!(classify(StatusCode::OK, &html), ResponseKind::Html);
    }

    #[tokio::test]
    async fn test_rewrite_html_response() {
        let response = origin_response(
            200,
            &[
                ("content-type", "text/html"),
                ("content-length", "17"),
                ("cache-control", "max-age=60"),
            ],
            r#"<a href="/x">x</a>"#,
        );
        let out = rewrite(response, &relay(), "https://example.com/page?q=1").await.unwrap();

        assert_eq!(out.status(), StatusCode::OK);
        assert!(out.headers().get(header::CONTENT_LENGTH).is_none());
        assert_eq!(out.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(out.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            body_text(out).await,
            r#"<a href="http://relay.test:8080/https://example.com/x">x</a>"#
        );
    }

    #[tokio::test]
    async fn test_rewrite_passthrough_keeps_body() {
        let body = r#"{"href":"/not-html"}"#;
        let response = origin_response(
            404,
            &[("content-type", "application/json"), ("transfer-encoding", "chunked")],
            body,
        );
        let out = rewrite(response, &relay(), "https://example.com/").await.unwrap();

        assert_eq!(out.status(), StatusCode::NOT_FOUND);
        assert!(out.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(out.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, PUT, DELETE");
        assert_eq!(body_text(out).await, body);
    }

    #[tokio::test]
    async fn test_encoded_html_is_not_rewritten() {
        let body = r#"<a href="/x">x</a>"#;
        let response = origin_response(
            200,
            &[
                ("content-type", "text/html"),
                ("content-encoding", "zstd"),
                ("content-length", "18"),
            ],
            body,
        );
        let out = rewrite(response, &relay(), "https://example.com/").await.unwrap();

        assert_eq!(out.headers()[header::CONTENT_ENCODING], "zstd");
        assert_eq!(out.headers()[header::CONTENT_LENGTH], "18");
        assert_eq!(body_text(out).await, body);
    }

    #[tokio::test]
    async fn test_rewrite_redirect_keeps_body_and_adds_policy() {
        let response = origin_response(
            302,
            &[("location", "/next"), ("content-type", "text/html")],
            r#"<a href="/next">moved</a>"#,
        );
        let out = rewrite(response, &relay(), "http://origin.test/").await.unwrap();

        assert_eq!(out.status(), StatusCode::FOUND);
        assert_eq!(out.headers()[header::LOCATION], "/http%3A%2F%2Forigin.test%2Fnext");
        assert_eq!(out.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(body_text(out).await, r#"<a href="/next">moved</a>"#);
    }

    #[tokio::test]
    async fn test_unparseable_location_is_an_error() {
        let response = origin_response(301, &[("location", "http://[broken")], "");
        let err = rewrite(response, &relay(), "http://origin.test/").await.unwrap_err();
        assert!(matches!(err, RelayError::Rewrite(_)));
    }
}
