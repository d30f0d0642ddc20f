//! Target resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → inbound.rs (scheme + host the client used to reach the relay)
//!     → target.rs  (path mode or params mode → TargetDescriptor)
//!     → security::access_control (allow-list)
//! ```

pub mod inbound;
pub mod target;

pub use inbound::{InboundContext, InboundScheme};
pub use target::{resolve, TargetDescriptor, TargetParams, TargetSource};
