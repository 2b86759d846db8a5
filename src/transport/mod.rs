//! Wire framing for the stream protocols.
//!
//! # Data Flow
//! ```text
//! socket bytes
//!     → Decoder::decode (split a complete frame off the buffer)
//!     → protocol codec (frame → Query)
//!     ...
//!     → Encoder::encode (wrap reply payload)
//!     → socket bytes
//! ```
//!
//! # Design Decisions
//! - Framing is independent of protocol semantics; a listener pairs one
//!   [`Framing`] with one stream protocol
//! - Malformed framing is a transport error: the stream position is lost,
//!   so the session cannot continue

pub mod line;
pub mod netstring;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

pub use line::LineCodec;
pub use netstring::NetstringCodec;

/// Error raised while splitting or wrapping frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame exceeds {max} bytes")]
    TooLong { max: usize },

    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

impl FrameError {
    /// True when the underlying I/O error is a read/write deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(e) if matches!(e.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        )
    }
}

/// Framing selectable per listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// `\n`-terminated lines.
    Line,
    /// `<len>:<payload>,` netstrings.
    Netstring,
}

impl Framing {
    /// Build a fresh codec for one connection.
    pub fn codec(self, max_frame_len: usize) -> FrameCodec {
        match self {
            Framing::Line => FrameCodec::Line(LineCodec::new(max_frame_len)),
            Framing::Netstring => FrameCodec::Netstring(NetstringCodec::new(max_frame_len)),
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::Line => write!(f, "line"),
            Framing::Netstring => write!(f, "netstring"),
        }
    }
}

/// Codec chosen by [`Framing`], dispatching to the concrete implementation.
#[derive(Debug)]
pub enum FrameCodec {
    Line(LineCodec),
    Netstring(NetstringCodec),
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        match self {
            FrameCodec::Line(c) => c.decode(src),
            FrameCodec::Netstring(c) => c.decode(src),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, FrameError> {
        match self {
            FrameCodec::Line(c) => c.decode_eof(src),
            FrameCodec::Netstring(c) => c.decode_eof(src),
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
        match self {
            FrameCodec::Line(c) => c.encode(item, dst),
            FrameCodec::Netstring(c) => c.encode(item, dst),
        }
    }
}
