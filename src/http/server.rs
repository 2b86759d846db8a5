//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the auth_http handler
//! - Wire up middleware (tracing, request ID, timeout, panic recovery)
//! - Serve on a Unix socket, plain TCP or TLS over TCP
//! - Stop accepting on the shutdown broadcast

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::Backend;
use crate::config::HttpListenerConfig;
use crate::http::auth::auth_handler;
use crate::net::listener::remove_stale_socket;

/// Grace period given to in-flight TLS requests on shutdown.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error type for the HTTP listener.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("failed to bind HTTP listener: {0}")]
    Bind(std::io::Error),

    #[error("failed to load TLS material from {}: {source}", path.display())]
    Tls {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(std::io::Error),
}

/// Where the HTTP adapter accepts requests.
pub enum HttpListener {
    Unix { listener: UnixListener, path: PathBuf },
    Tcp(TcpListener),
    Tls { addr: SocketAddr, config: RustlsConfig },
}

impl HttpListener {
    /// Bind according to a validated listener config.
    pub async fn bind(config: &HttpListenerConfig) -> Result<Self, HttpServerError> {
        if let Some(path) = &config.socket_path {
            return Self::bind_unix(path);
        }

        let addr: SocketAddr = config
            .bind_address
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e| HttpServerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

        match &config.tls {
            Some(tls) => {
                // Read both files first so the error names the one at fault.
                let cert = read_pem(&tls.cert_path).await?;
                let key = read_pem(&tls.key_path).await?;
                let config = RustlsConfig::from_pem(cert, key)
                    .await
                    .map_err(|source| HttpServerError::Tls {
                        path: tls.cert_path.clone(),
                        source,
                    })?;
                Ok(HttpListener::Tls { addr, config })
            }
            None => {
                let listener = TcpListener::bind(addr).await.map_err(HttpServerError::Bind)?;
                Ok(HttpListener::Tcp(listener))
            }
        }
    }

    pub fn bind_unix(path: &Path) -> Result<Self, HttpServerError> {
        remove_stale_socket(path).map_err(HttpServerError::Bind)?;
        let listener = UnixListener::bind(path).map_err(HttpServerError::Bind)?;
        Ok(HttpListener::Unix {
            listener,
            path: path.to_path_buf(),
        })
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, HttpServerError> {
    tokio::fs::read(path).await.map_err(|source| HttpServerError::Tls {
        path: path.to_path_buf(),
        source,
    })
}

/// HTTP server for the auth_http adapter.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server answering with `backend`.
    pub fn new<B: Backend>(config: &HttpListenerConfig, backend: Arc<B>) -> Self {
        Self {
            router: Self::build_router(config, backend),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<B: Backend>(config: &HttpListenerConfig, backend: Arc<B>) -> Router {
        Router::new()
            .route("/{*path}", any(auth_handler::<B>))
            .route("/", any(auth_handler::<B>))
            .with_state(backend)
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown broadcast fires.
    pub async fn run(self, listener: HttpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), HttpServerError> {
        match listener {
            HttpListener::Unix { listener, path } => {
                tracing::info!(path = %path.display(), "HTTP server starting");
                let result = axum::serve(listener, self.router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::debug!(path = %path.display(), error = %e, "Could not remove socket file");
                }
                result.map_err(HttpServerError::Serve)?;
            }
            HttpListener::Tcp(listener) => {
                let addr = listener.local_addr().map_err(HttpServerError::Bind)?;
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                    })
                    .await
                    .map_err(HttpServerError::Serve)?;
            }
            HttpListener::Tls { addr, config } => {
                tracing::info!(address = %addr, "HTTPS server starting");
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    trigger.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
                });
                axum_server::bind_rustls(addr, config)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await
                    .map_err(HttpServerError::Serve)?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
