//! JSON-over-HTTP backend client.

use std::time::Duration;

use crate::backend::{Backend, BackendError};
use crate::config::BackendConfig;
use crate::protocol::{Query, Response};

/// Posts each [`Query`] as JSON and decodes the [`Response`] body.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = reqwest::Url::parse(&config.url)
            .map_err(|e| BackendError::Unavailable(format!("invalid url {}: {}", config.url, e)))?;

        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }
}

impl Backend for HttpBackend {
    async fn request(&self, query: &Query) -> Result<Response, BackendError> {
        let res = self
            .client
            .post(self.url.clone())
            .json(query)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        res.json::<Response>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}
