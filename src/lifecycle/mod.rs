//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Bind listeners → Spawn accept loops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Listeners stop accepting → Sessions drain → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: every socket is bound before any is served
//! - Ordered shutdown: stop accept, drain, close
//! - Draining has a deadline; sessions still open after it are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, Running, ServerError};
