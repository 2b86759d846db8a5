//! Unix socket listener with backpressure and shutdown-aware accept loop.
//!
//! # Responsibilities
//! - Bind the configured socket path (replacing a stale socket file)
//! - Accept incoming connections under a bounded deadline
//! - Enforce max_connections limit via semaphore
//! - Hand each connection to its own session task

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Semaphore};
use tokio::time;

use crate::backend::Backend;
use crate::net::session::SessionHandler;

/// Failure to bind a socket or accept from it.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("cannot bind socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

/// Unix socket listener for one stream protocol.
///
/// At most `max_connections` sessions run at once; further clients queue in
/// the kernel backlog until a session ends.
pub struct Listener {
    inner: UnixListener,
    /// Removed again when the listener is dropped.
    path: PathBuf,
    slots: Arc<Semaphore>,
    max_connections: usize,
    accept_timeout: Duration,
}

impl Listener {
    /// Bind to `path` with connection limits.
    pub fn bind(path: &Path, max_connections: usize, accept_timeout: Duration) -> Result<Self, ListenerError> {
        remove_stale_socket(path).map_err(ListenerError::Bind)?;
        let inner = UnixListener::bind(path).map_err(ListenerError::Bind)?;

        tracing::info!(path = %path.display(), max_connections, "Socket bound");

        Ok(Self {
            inner,
            path: path.to_path_buf(),
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            accept_timeout,
        })
    }

    /// Wait for a free session slot, then for a client.
    ///
    /// The returned permit must live as long as the session.
    pub async fn accept(&self) -> Result<(UnixStream, ConnectionPermit), ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| ListenerError::Accept(std::io::Error::other(e)))?;

        let (stream, _) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            path = %self.path.display(),
            free_slots = self.slots.available_permits(),
            "Client connected"
        );

        Ok((stream, ConnectionPermit { _permit: permit }))
    }

    /// Run the accept loop until `shutdown` fires.
    ///
    /// Every accept attempt is bounded by the accept timeout so the shutdown
    /// signal is re-checked at least that often. Sessions already running are
    /// left to finish on their own.
    pub async fn serve<B: Backend>(
        self,
        handler: Arc<SessionHandler<B>>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let protocol = handler.protocol();
        tracing::info!(path = %self.path.display(), protocol = %protocol, "Accept loop starting");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(protocol = %protocol, "Listener received shutdown signal");
                    return Ok(());
                }
                accepted = time::timeout(self.accept_timeout, self.accept()) => match accepted {
                    // Deadline expired; loop around and re-check shutdown.
                    Err(_) => continue,
                    Ok(Ok((stream, permit))) => {
                        Arc::clone(&handler).spawn(stream, permit);
                    }
                    Ok(Err(e)) => {
                        tracing::error!(protocol = %protocol, error = %e, "Accept failed, stopping listener");
                        return Err(e);
                    }
                },
            }
        }
    }

    /// Path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Session slots not currently in use.
    pub fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "Could not remove socket file");
        }
    }
}

/// Remove a socket file left behind by a previous run.
pub fn remove_stale_socket(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed stale socket file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// One occupied session slot; dropping it frees the slot.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
