//! Relay error taxonomy and its HTTP mapping.
//!
//! Every failure is terminal for the request. Client input problems map to
//! 400, policy denials to 403 and everything else to 500 with the
//! underlying message exposed. Error bodies are always JSON.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors that can end a relayed request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// `params` decoded but carried no usable `target`.
    #[error("Missing target URL in params")]
    MissingTarget,

    /// `params` was not the expected JSON object.
    #[error("Invalid params format: {0}")]
    InvalidParams(String),

    /// The path could not be turned into a target string.
    #[error("Malformed target: {0}")]
    MalformedTarget(String),

    /// The destination host is not covered by the allow-list.
    #[error("Access denied: Domain not in whitelist")]
    AccessDenied,

    /// The origin could not be reached or its body could not be read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The origin response could not be rewritten.
    #[error("{0}")]
    Rewrite(String),

    /// No origin response within `timeouts.request_secs`.
    #[error("Origin did not respond within {0}s")]
    Timeout(u64),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingTarget | RelayError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            RelayError::AccessDenied => StatusCode::FORBIDDEN,
            RelayError::MalformedTarget(_)
            | RelayError::Transport(_)
            | RelayError::Rewrite(_)
            | RelayError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metrics label for this failure class.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::MissingTarget | RelayError::InvalidParams(_) => "client_error",
            RelayError::AccessDenied => "denied",
            RelayError::Timeout(_) => "timeout",
            _ => "error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Build a JSON error response with the given status.
pub fn json_error(status: StatusCode, message: String) -> Response {
    let body = serde_json::to_vec(&ErrorBody { error: message })
        .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        json_error(self.status_code(), self.to_string())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
