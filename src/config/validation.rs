//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject allow-list entries that can never match a hostname
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::security::access_control::AllowList;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("allow-list entry '{0}' must be a bare domain")]
    AllowListEntry(String),

    #[error("reserved header prefix must not be empty")]
    EmptyHeaderPrefix,

    #[error("TLS {0} path must not be empty")]
    TlsPath(&'static str),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("certificate"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("key"));
        }
    }

    let allow_list = AllowList::parse(&config.access.whitelist_domains);
    for entry in allow_list.domains() {
        if entry.contains("://") || entry.contains('/') || entry.chars().any(char::is_whitespace) {
            errors.push(ValidationError::AllowListEntry(entry.clone()));
        }
    }

    if let Some(prefix) = &config.forward.reserved_header_prefix {
        if prefix.trim().is_empty() {
            errors.push(ValidationError::EmptyHeaderPrefix);
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
