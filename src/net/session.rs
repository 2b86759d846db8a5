//! Per-connection session loop for the stream protocols.
//!
//! # Responsibilities
//! - Own one accepted connection for its whole life
//! - Read a frame, translate it, call the backend, write the reply
//! - Close idle connections quietly
//! - Contain every failure inside the session task
//!
//! # Design Decisions
//! - Strictly one request in flight per connection (no pipelining)
//! - Reads and writes are bounded by a rolling idle deadline; the backend
//!   call is not
//! - The stream is owned by the loop, so it is closed exactly once when the
//!   loop returns, whatever the exit path

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::time::{self, Instant};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::Instrument;

use crate::backend::Backend;
use crate::config::StreamListenerConfig;
use crate::net::connection::{ConnectionTracker, SessionId};
use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;
use crate::protocol::{Fault, Reply, Request, Status, StreamProtocol};
use crate::transport::{FrameError, Framing};

/// Why a session ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] FrameError),

    #[error("write deadline expired")]
    WriteTimeout,

    #[error(transparent)]
    Fault(#[from] Fault),
}

/// Settings shared by every session of one listener.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub protocol: StreamProtocol,
    pub framing: Framing,
    pub idle_timeout: Duration,
    pub max_frame_len: usize,
}

impl SessionConfig {
    pub fn from_listener(protocol: StreamProtocol, listener: &StreamListenerConfig) -> Self {
        Self {
            protocol,
            framing: listener.framing_for(protocol),
            idle_timeout: listener.idle_timeout(),
            max_frame_len: listener.max_frame_len,
        }
    }
}

/// Spawns and runs sessions for one listener.
pub struct SessionHandler<B> {
    config: SessionConfig,
    backend: Arc<B>,
    tracker: ConnectionTracker,
}

impl<B: Backend> SessionHandler<B> {
    pub fn new(config: SessionConfig, backend: Arc<B>, tracker: ConnectionTracker) -> Self {
        Self {
            config,
            backend,
            tracker,
        }
    }

    pub fn protocol(&self) -> StreamProtocol {
        self.config.protocol
    }

    /// Start an independent task serving `stream`.
    pub fn spawn(self: Arc<Self>, stream: UnixStream, permit: ConnectionPermit) {
        let guard = self.tracker.track(self.config.protocol);
        let id = guard.id();
        let span = tracing::info_span!("session", session = %id);

        tokio::spawn(
            async move {
                let _permit = permit;
                let _guard = guard;
                let codec = self.config.framing.codec(self.config.max_frame_len);
                let framed = Framed::new(stream, codec);

                match AssertUnwindSafe(self.run(id, framed)).catch_unwind().await {
                    Ok(Ok(())) => tracing::debug!("Session finished"),
                    Ok(Err(SessionError::Fault(fault))) => {
                        tracing::error!(error = %fault, "Session aborted after backend failure")
                    }
                    Ok(Err(e)) => tracing::warn!(error = %e, "Session aborted"),
                    Err(_) => tracing::error!("Session panicked; connection dropped"),
                }
            }
            .instrument(span),
        );
    }

    /// Serve one connection until end-of-stream, idle timeout or a fatal error.
    ///
    /// Generic over the transport so tests can drive it with in-memory pipes.
    pub async fn run<T, C>(&self, id: SessionId, mut framed: Framed<T, C>) -> Result<(), SessionError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        C: Decoder<Item = BytesMut, Error = FrameError> + Encoder<Bytes, Error = FrameError> + Unpin,
    {
        let protocol = self.config.protocol;
        let idle = self.config.idle_timeout;
        let mut deadline = Instant::now() + idle;

        loop {
            let frame = match time::timeout_at(deadline, framed.next()).await {
                Err(_) => {
                    tracing::debug!(session = %id, "Idle timeout, closing");
                    return Ok(());
                }
                Ok(None) => {
                    tracing::debug!(session = %id, "Peer closed connection");
                    return Ok(());
                }
                Ok(Some(Err(e))) if e.is_timeout() => {
                    tracing::debug!(session = %id, "Read timed out, closing");
                    return Ok(());
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(frame))) => frame,
            };
            deadline = Instant::now() + idle;

            let reply = match protocol.parse(&frame) {
                Request::Ignore => continue,
                Request::Reject(payload) => {
                    tracing::debug!(session = %id, "Rejected malformed request");
                    metrics::record_request(protocol.name(), "rejected");
                    Reply::Continue(payload)
                }
                Request::Lookup(query) => {
                    tracing::trace!(session = %id, verb = %query.verb, "Lookup");
                    let started = Instant::now();
                    let outcome = self.backend.request(&query).await;
                    metrics::record_backend_call(protocol.name(), started.elapsed());
                    let status = outcome.as_ref().ok().map(|r| r.status);
                    let reply = protocol.render(outcome);
                    metrics::record_request(protocol.name(), outcome_label(&reply, status));
                    reply
                }
            };

            match reply {
                Reply::Continue(payload) => self.send(&mut framed, payload, deadline).await?,
                Reply::Fatal(payload, fault) => {
                    // Best effort: the session ends with the fault either way.
                    if let Err(e) = self.send(&mut framed, payload, deadline).await {
                        tracing::debug!(session = %id, error = %e, "Could not deliver failure reply");
                    }
                    return Err(fault.into());
                }
            }
            deadline = Instant::now() + idle;
        }
    }

    async fn send<T, C>(&self, framed: &mut Framed<T, C>, payload: Bytes, deadline: Instant) -> Result<(), SessionError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
        C: Encoder<Bytes, Error = FrameError> + Unpin,
    {
        match time::timeout_at(deadline, framed.send(payload)).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(SessionError::WriteTimeout),
        }
    }
}

fn outcome_label(reply: &Reply, status: Option<Status>) -> &'static str {
    match (reply, status) {
        (Reply::Fatal(..), _) => "failed",
        (Reply::Continue(_), Some(Status::NotFound)) => "not_found",
        (Reply::Continue(_), _) => "found",
    }
}
