//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind every enabled listener before serving any of them
//! - Start one task per listener, each subscribed to shutdown
//! - Wait for listeners to stop and sessions to drain
//!
//! # Design Decisions
//! - Fail fast: any bind error aborts startup
//! - Listeners start last (traffic only when everything is bound)

use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::config::GatewayConfig;
use crate::http::{HttpListener, HttpServer, HttpServerError};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError, SessionConfig, SessionHandler};
use crate::protocol::StreamProtocol;

/// Failure of a listener, at bind time or while serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{protocol} listener: {source}")]
    Stream {
        protocol: StreamProtocol,
        #[source]
        source: ListenerError,
    },

    #[error("http listener: {0}")]
    Http(#[from] HttpServerError),

    #[error("{0} task ended abnormally")]
    Task(&'static str),

    #[error("{0} listener stopped before shutdown")]
    Stopped(&'static str),
}

/// Handles to the running listeners.
pub struct Running {
    tasks: Vec<(&'static str, JoinHandle<Result<(), ServerError>>)>,
    tracker: ConnectionTracker,
}

impl Running {
    /// Tracker counting open stream sessions.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Resolves when any listener ends on its own, with the reason.
    ///
    /// A listener only returns early when it fails, so every outcome here is
    /// an error. The finished task is no longer awaited by [`Running::wait`].
    pub async fn listener_stopped(&mut self) -> ServerError {
        if self.tasks.is_empty() {
            return future::pending().await;
        }
        let (joined, index, _) = future::select_all(self.tasks.iter_mut().map(|(_, task)| task)).await;
        let (name, _) = self.tasks.remove(index);
        match joined {
            Ok(Ok(())) => ServerError::Stopped(name),
            Ok(Err(e)) => e,
            Err(_) => ServerError::Task(name),
        }
    }

    /// Wait for every listener to stop, then for stream sessions to drain.
    ///
    /// Returns the first listener error, if any.
    pub async fn wait(self, drain_timeout: Duration) -> Result<(), ServerError> {
        let mut first_error = None;
        for (name, task) in self.tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(_) => Err(ServerError::Task(name)),
            };
            if let Err(e) = result {
                tracing::error!(listener = name, error = %e, "Listener failed");
                first_error.get_or_insert(e);
            }
        }

        let open = self.tracker.active_count();
        if open > 0 {
            tracing::info!(open, "Waiting for sessions to drain");
            if !self.tracker.drain(drain_timeout).await {
                tracing::warn!(open = self.tracker.active_count(), "Drain timeout elapsed, abandoning sessions");
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Bind all enabled listeners and start serving.
pub async fn start<B: Backend>(
    config: &GatewayConfig,
    backend: Arc<B>,
    shutdown: &Shutdown,
) -> Result<Running, ServerError> {
    let tracker = ConnectionTracker::new();
    let mut stream_listeners = Vec::new();

    for protocol in [StreamProtocol::Socketmap, StreamProtocol::Dict] {
        let listener_config = config.stream(protocol);
        if !listener_config.enabled {
            continue;
        }
        let Some(path) = listener_config.socket_path.as_deref() else {
            continue;
        };
        let listener = Listener::bind(path, listener_config.max_connections, listener_config.accept_timeout())
            .map_err(|source| ServerError::Stream { protocol, source })?;
        let session_config = SessionConfig::from_listener(protocol, listener_config);
        tracing::info!(
            protocol = %protocol,
            framing = %session_config.framing,
            idle_timeout_secs = listener_config.idle_timeout_secs,
            "Stream listener configured"
        );
        let handler = Arc::new(SessionHandler::new(session_config, Arc::clone(&backend), tracker.clone()));
        stream_listeners.push((protocol, listener, handler));
    }

    let http = if config.http.enabled {
        let listener = HttpListener::bind(&config.http).await?;
        Some((HttpServer::new(&config.http, Arc::clone(&backend)), listener))
    } else {
        None
    };

    let mut tasks = Vec::new();
    for (protocol, listener, handler) in stream_listeners {
        let rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            listener
                .serve(handler, rx)
                .await
                .map_err(|source| ServerError::Stream { protocol, source })
        });
        tasks.push((protocol.name(), task));
    }

    if let Some((server, listener)) = http {
        let rx = shutdown.subscribe();
        let task = tokio::spawn(async move { server.run(listener, rx).await.map_err(ServerError::from) });
        tasks.push(("http", task));
    }

    Ok(Running { tasks, tracker })
}
