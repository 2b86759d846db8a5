//! Backend query executor interface.
//!
//! # Responsibilities
//! - Define the single call every protocol adapter depends on
//! - Distinguish a failed call from a negative lookup result
//!
//! # Design Decisions
//! - The handle is shared read-only across sessions (`Arc<B>`), so
//!   implementations must be `Send + Sync`
//! - No retries here; a failed call is surfaced immediately

pub mod http;

use std::future::Future;

use crate::protocol::{Query, Response};

pub use self::http::HttpBackend;

/// Failure of the backend call itself (not a `NotFound` result).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("backend reply could not be decoded: {0}")]
    Decode(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves queries on behalf of the protocol adapters.
pub trait Backend: Send + Sync + 'static {
    fn request(&self, query: &Query) -> impl Future<Output = Result<Response, BackendError>> + Send;
}
