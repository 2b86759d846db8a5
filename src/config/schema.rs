//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::StreamProtocol;
use crate::transport::Framing;

/// Root configuration for the lookup gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Backend query executor.
    pub backend: BackendConfig,

    /// Postfix socketmap listener.
    pub socketmap: StreamListenerConfig,

    /// Dovecot dict listener.
    pub dict: StreamListenerConfig,

    /// nginx auth_http listener.
    pub http: HttpListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// How long to wait for open stream sessions after shutdown, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            socketmap: StreamListenerConfig::default(),
            dict: StreamListenerConfig::default(),
            http: HttpListenerConfig::default(),
            observability: ObservabilityConfig::default(),
            drain_timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    /// Listener settings for a stream protocol.
    pub fn stream(&self, protocol: StreamProtocol) -> &StreamListenerConfig {
        match protocol {
            StreamProtocol::Socketmap => &self.socketmap,
            StreamProtocol::Dict => &self.dict,
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// URL queries are POSTed to. Required; empty means unset.
    pub url: String,

    /// Per-request timeout in seconds (0 = unbounded).
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 0,
        }
    }
}

/// Settings shared by the socketmap and dict listeners.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamListenerConfig {
    /// Serve this protocol.
    pub enabled: bool,

    /// Filesystem path of the listening socket.
    pub socket_path: Option<PathBuf>,

    /// Wire framing; the protocol's native framing when unset.
    pub framing: Option<Framing>,

    /// Close a connection after this many idle seconds.
    pub idle_timeout_secs: u64,

    /// Accept deadline in milliseconds; bounds shutdown latency.
    pub accept_timeout_ms: u64,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Largest accepted frame payload in bytes.
    pub max_frame_len: usize,
}

impl Default for StreamListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            socket_path: None,
            framing: None,
            idle_timeout_secs: 30,
            accept_timeout_ms: 1000,
            max_connections: 1024,
            max_frame_len: 100_000,
        }
    }
}

impl StreamListenerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn framing_for(&self, protocol: StreamProtocol) -> Framing {
        self.framing.unwrap_or_else(|| protocol.default_framing())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpListenerConfig {
    /// Serve the auth_http endpoint.
    pub enabled: bool,

    /// Unix socket path (exclusive with `bind_address`).
    pub socket_path: Option<PathBuf>,

    /// TCP bind address, e.g. "127.0.0.1:9000".
    pub bind_address: Option<String>,

    /// Optional TLS configuration (TCP only).
    pub tls: Option<TlsConfig>,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpListenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            socket_path: None,
            bind_address: None,
            tls: None,
            request_timeout_secs: 30,
        }
    }
}

/// TLS configuration for the HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
