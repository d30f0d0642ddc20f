//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs   (Axum setup, middleware, relay handler)
//!     → request.rs  (request ID)
//!     → routing     (resolve target) → security (allow-list)
//!     → forward.rs  (outbound request to the origin)
//!     → response.rs (redirect / HTML rewrite, client header policy)
//!     → Send to client
//!
//! GET / without params → portal.rs
//! ```

pub mod forward;
pub mod portal;
pub mod request;
pub mod response;
pub mod server;

pub use forward::Forwarder;
pub use request::{MakeRelayRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, RelaySnapshot};
