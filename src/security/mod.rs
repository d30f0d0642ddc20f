//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Resolved target:
//!     → access_control.rs (allow-list check on the hostname)
//! Outbound request:
//!     → headers.rs (drop reserved-prefix and hop-by-hop headers)
//! Client response:
//!     → headers.rs (no-store + permissive CORS)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a target that does not parse is refused
//! - Empty allow-list means open relay
//! - Header names compared lowercase

pub mod access_control;
pub mod headers;

pub use access_control::{AllowList, Denial};
