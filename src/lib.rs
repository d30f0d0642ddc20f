//! HTTP forwarding relay library.
//!
//! A request names its destination in the path (`/https://example.com/x`)
//! or in a JSON `params` query value. The destination is checked against a
//! domain allow-list, forwarded, and the response is rewritten so redirects
//! and root-relative HTML links lead back through the relay.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
