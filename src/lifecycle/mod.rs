//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init metrics → Start watcher → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → stop accepting → drain in-flight requests
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
