//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Unix socket / TCP / TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → auth.rs (headers → Query, Response → Auth-* headers)
//!     → backend
//! ```
//!
//! # Design Decisions
//! - Request scoped: no state survives a request
//! - Any failure becomes a 500; panics are caught by middleware so the
//!   listener keeps serving

pub mod auth;
pub mod server;

pub use server::{HttpListener, HttpServer, HttpServerError};
