//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional) + CLI/env overrides
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → RelaySnapshot shared via ArcSwap with the request handler
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the snapshot
//!     → the next request observes the new allow-list and portal page
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults so the relay runs without a file
//! - Listener and client settings only take effect on restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigOverrides};
pub use schema::{
    AccessConfig, ForwardConfig, ListenerConfig, LogFormat, ObservabilityConfig, PortalConfig,
    PortalPage, RelayConfig, TimeoutConfig, TlsConfig,
};
