//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use crate::protocol::StreamProtocol;
    use crate::transport::Framing;

    const SAMPLE: &str = r#"
        drain_timeout_secs = 5

        [backend]
        url = "http://10.0.0.5:8000/lookup"
        timeout_secs = 3

        [socketmap]
        enabled = true
        socket_path = "/run/lookup/socketmap.sock"
        idle_timeout_secs = 60

        [dict]
        enabled = true
        socket_path = "/run/lookup/dict.sock"
        framing = "line"

        [http]
        enabled = true
        bind_address = "127.0.0.1:9000"

        [observability]
        log_format = "json"
    "#;

    #[test]
    fn parses_sample_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.drain_timeout_secs, 5);
        assert_eq!(config.backend.timeout_secs, 3);
        assert_eq!(config.socketmap.idle_timeout_secs, 60);
        assert_eq!(config.socketmap.accept_timeout_ms, 1000);
        assert_eq!(config.socketmap.framing_for(StreamProtocol::Socketmap), Framing::Netstring);
        assert_eq!(config.dict.framing_for(StreamProtocol::Dict), Framing::Line);
        assert_eq!(config.http.bind_address.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn surfaces_parse_and_validation_errors() {
        assert!(matches!(parse_config("[socketmap]\nframing = \"xml\""), Err(ConfigError::Parse(_))));
        assert!(matches!(parse_config(""), Err(ConfigError::Validation(_))));
    }
}
