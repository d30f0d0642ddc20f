//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Destination allow-list.
    pub access: AccessConfig,

    /// Page served at the root path.
    pub portal: PortalConfig,

    /// Outbound request shaping.
    pub forward: ForwardConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When set the relay advertises `https:`
    /// as its own scheme.
    pub tls: Option<TlsConfig>,

    /// Honor `X-Forwarded-Proto` / `X-Forwarded-Host` when working out the
    /// scheme and host the relay is reachable on.
    pub trust_forwarded_headers: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            trust_forwarded_headers: false,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Destination access configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Comma-separated domain suffixes. Empty allows every destination.
    pub whitelist_domains: String,
}

/// Which static page is served at `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PortalPage {
    #[default]
    Portal,
    Nginx,
}

impl PortalPage {
    pub fn file_name(&self) -> &'static str {
        match self {
            PortalPage::Portal => "portal.html",
            PortalPage::Nginx => "nginx.html",
        }
    }
}

// Unknown names fall back to the portal page.
impl From<String> for PortalPage {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "nginx.html" | "nginx" => PortalPage::Nginx,
            _ => PortalPage::Portal,
        }
    }
}

impl From<PortalPage> for String {
    fn from(page: PortalPage) -> Self {
        page.file_name().to_string()
    }
}

/// Root page configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    pub page: PortalPage,
}

/// Outbound request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Inbound headers starting with this prefix are never forwarded.
    /// `None` forwards every header.
    pub reserved_header_prefix: Option<String>,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            reserved_header_prefix: Some("cf-".to_string()),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout to the origin in seconds.
    pub connect_secs: u64,

    /// Whole-request timeout in seconds. Disabled when unset.
    pub request_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
