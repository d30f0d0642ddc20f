//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly with Tokio; TLS termination goes
//! through `axum-server` with a rustls configuration loaded here. The
//! inbound scheme the relay advertises (`http:` or `https:`) follows from
//! which of the two is used.

pub mod tls;
