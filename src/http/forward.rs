//! Outbound request construction and dispatch.
//!
//! # Responsibilities
//! - Filter inbound headers and lay the target's overrides on top
//! - Reuse the inbound method and stream the inbound body
//! - Issue exactly one attempt with redirects left to the caller
//!
//! # Design Decisions
//! - Bodies are never buffered on the way out
//! - Compressed origin bodies are decoded by the client so downstream
//!   rewriting always sees plain bytes

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{Request, Response},
};

use crate::config::TimeoutConfig;
use crate::error::RelayResult;
use crate::routing::TargetDescriptor;
use crate::security::headers::{forwardable_headers, merge_overrides};

/// Single-attempt HTTP client towards origins.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// Send `request` to the resolved target and hand back the raw origin
    /// response.
    pub async fn forward(
        &self,
        target: &TargetDescriptor,
        request: Request<Body>,
        reserved_prefix: Option<&str>,
    ) -> RelayResult<Response<Body>> {
        let (parts, body) = request.into_parts();
        let headers = merge_overrides(
            forwardable_headers(&parts.headers, reserved_prefix),
            target.header_overrides(),
        );

        let mut outbound = self
            .client
            .request(parts.method, target.url())
            .headers(headers);

        // Bodiless requests must stay bodiless (no chunked GET).
        if !body.is_end_stream() {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = outbound.send().await?;
        tracing::debug!(
            url = %target.url(),
            status = %response.status(),
            "Origin responded"
        );

        Ok(Response::<reqwest::Body>::from(response).map(Body::new))
    }
}
