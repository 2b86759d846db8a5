//! Network layer subsystem for the stream protocols.
//!
//! # Data Flow
//! ```text
//! Incoming Unix socket connection
//!     → listener.rs (accept loop, connection limits, shutdown checks)
//!     → connection.rs (id, lifecycle tracking)
//!     → session.rs (frame → protocol codec → backend → reply)
//!
//! Session exits:
//!     end-of-stream | idle timeout → clean close
//!     transport error | backend failure → logged, closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept deadline keeps shutdown responsive
//! - Each connection runs in its own task; nothing escapes it
//! - Shutdown stops accepting but lets open sessions drain

pub mod connection;
pub mod listener;
pub mod session;

pub use connection::{ConnectionGuard, ConnectionTracker, SessionId};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use session::{SessionConfig, SessionError, SessionHandler};
