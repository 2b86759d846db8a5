//! Protocol translation subsystem.
//!
//! # Data Flow
//! ```text
//! decoded frame
//!     → socketmap.rs / dict.rs (frame → Request)
//!     → backend (Query → Response)
//!     → socketmap.rs / dict.rs (Response → Reply)
//!     → frame encoder
//! ```
//!
//! # Design Decisions
//! - Codecs are pure functions with no I/O, so they are tested in isolation
//! - The protocol is picked once per listener, never per frame
//! - A reply that ends the session carries the reason with it

pub mod dict;
pub mod socketmap;
pub mod types;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::transport::Framing;

pub use types::{Query, Response, Status, Value};

/// What a stream codec made of one incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Forward this query to the backend.
    Lookup(Query),
    /// Nothing to answer (handshake, keep-alive).
    Ignore,
    /// Client sent something unusable; answer and keep reading.
    Reject(Bytes),
}

/// Why a reply ends the session.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("backend contract violation: {0}")]
    Contract(String),
}

/// Outgoing payload produced from a backend outcome.
#[derive(Debug)]
pub enum Reply {
    /// Write the payload and keep serving.
    Continue(Bytes),
    /// Write the payload best-effort, then close the connection.
    Fatal(Bytes, Fault),
}

impl Reply {
    pub fn payload(&self) -> &Bytes {
        match self {
            Reply::Continue(b) | Reply::Fatal(b, _) => b,
        }
    }
}

/// Stream protocol served by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    /// Postfix socketmap lookup table.
    Socketmap,
    /// Dovecot dict/auth lookup.
    Dict,
}

impl StreamProtocol {
    pub fn parse(self, frame: &[u8]) -> Request {
        match self {
            StreamProtocol::Socketmap => socketmap::parse(frame),
            StreamProtocol::Dict => dict::parse(frame),
        }
    }

    pub fn render(self, outcome: Result<Response, BackendError>) -> Reply {
        match self {
            StreamProtocol::Socketmap => socketmap::render(outcome),
            StreamProtocol::Dict => dict::render(outcome),
        }
    }

    /// Framing the peer speaks unless configured otherwise.
    pub fn default_framing(self) -> Framing {
        match self {
            StreamProtocol::Socketmap => Framing::Netstring,
            StreamProtocol::Dict => Framing::Line,
        }
    }

    /// Label used in logs and metrics.
    pub fn name(self) -> &'static str {
        match self {
            StreamProtocol::Socketmap => "socketmap",
            StreamProtocol::Dict => "dict",
        }
    }
}

impl std::fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn contract_violation(response: &Response) -> Fault {
    Fault::Contract(format!("unexpected response {:?}", response))
}
