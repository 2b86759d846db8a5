//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Detect listeners that would collide on the same socket path
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::{GatewayConfig, StreamListenerConfig};
use crate::protocol::StreamProtocol;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.backend.url) {
        _ if config.backend.url.is_empty() => errors.push(ValidationError::new("backend.url", "required")),
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "backend.url",
            format!("unsupported scheme {}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("backend.url", e.to_string())),
    }

    for protocol in [StreamProtocol::Socketmap, StreamProtocol::Dict] {
        validate_stream(protocol.name(), config.stream(protocol), &mut errors);
    }

    let http = &config.http;
    if http.enabled {
        match (&http.socket_path, &http.bind_address) {
            (Some(_), Some(_)) => errors.push(ValidationError::new(
                "http",
                "socket_path and bind_address are mutually exclusive",
            )),
            (None, None) => errors.push(ValidationError::new("http", "socket_path or bind_address is required")),
            (_, Some(addr)) => {
                if addr.parse::<SocketAddr>().is_err() {
                    errors.push(ValidationError::new("http.bind_address", format!("invalid address {}", addr)));
                }
            }
            (Some(_), None) => {}
        }
        if http.tls.is_some() && http.bind_address.is_none() {
            errors.push(ValidationError::new("http.tls", "TLS requires bind_address"));
        }
        if http.request_timeout_secs == 0 {
            errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
        }
    }

    let mut seen = HashSet::new();
    let paths = [
        config.socketmap.enabled.then_some(config.socketmap.socket_path.as_deref()).flatten(),
        config.dict.enabled.then_some(config.dict.socket_path.as_deref()).flatten(),
        http.enabled.then_some(http.socket_path.as_deref()).flatten(),
    ];
    for path in paths.into_iter().flatten() {
        if !seen.insert(path) {
            errors.push(ValidationError::new(
                "socket_path",
                format!("{} is used by more than one listener", path.display()),
            ));
        }
    }

    if !config.socketmap.enabled && !config.dict.enabled && !http.enabled {
        errors.push(ValidationError::new("listeners", "no listener is enabled"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid address {}", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_stream(name: &str, listener: &StreamListenerConfig, errors: &mut Vec<ValidationError>) {
    if !listener.enabled {
        return;
    }
    if listener.socket_path.as_deref().map_or(true, |p: &Path| p.as_os_str().is_empty()) {
        errors.push(ValidationError::new(format!("{}.socket_path", name), "required when enabled"));
    }
    let positive = [
        ("idle_timeout_secs", listener.idle_timeout_secs as usize),
        ("accept_timeout_ms", listener.accept_timeout_ms as usize),
        ("max_connections", listener.max_connections),
        ("max_frame_len", listener.max_frame_len),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(format!("{}.{}", name, field), "must be greater than 0"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn enabled(path: &str) -> StreamListenerConfig {
        StreamListenerConfig {
            enabled: true,
            socket_path: Some(PathBuf::from(path)),
            ..StreamListenerConfig::default()
        }
    }

    fn with_backend() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.backend.url = "http://127.0.0.1:8000/lookup".into();
        config
    }

    #[test]
    fn accepts_minimal_socketmap_config() {
        let mut config = with_backend();
        config.socketmap = enabled("/run/lookup/socketmap.sock");
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = GatewayConfig::default();
        config.backend.url = "ftp://backend".into();
        config.socketmap = enabled("/run/same.sock");
        config.socketmap.idle_timeout_secs = 0;
        config.dict = enabled("/run/same.sock");
        config.http.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["backend.url", "socketmap.idle_timeout_secs", "http", "socket_path"]
        );
    }

    #[test]
    fn rejects_config_without_listeners() {
        let errors = validate_config(&with_backend()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("listeners", "no listener is enabled")]);
    }

    #[test]
    fn backend_url_is_required() {
        let mut config = GatewayConfig::default();
        config.socketmap = enabled("/run/lookup/socketmap.sock");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("backend.url", "required")]);
    }

    #[test]
    fn tls_needs_tcp() {
        let mut config = with_backend();
        config.http.enabled = true;
        config.http.socket_path = Some(PathBuf::from("/run/auth.sock"));
        config.http.tls = Some(crate::config::schema::TlsConfig {
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "http.tls");
    }
}
