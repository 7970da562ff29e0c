//! Requests to the PC server that fronts the Pico W.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::protocol::{CommandResponse, CountResponse, GET_COUNT_PATH, START_COMMAND_PATH};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn start_command(&self) -> Result<CommandResponse, TransportError>;
    async fn get_count(&self) -> Result<CountResponse, TransportError>;
}

/// `DeviceApi` over plain HTTP GETs. Endpoint paths are resolved against the
/// server origin, so any path on `base_url` is ignored.
#[derive(Debug, Clone)]
pub struct HttpDeviceApi {
    http: Client,
    base_url: Url,
}

impl HttpDeviceApi {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> Result<T, TransportError> {
        let url = self.base_url.join(endpoint)?;
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { endpoint, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request { endpoint, source })?;
        serde_json::from_slice(&body).map_err(|source| TransportError::Malformed { endpoint, source })
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceApi {
    async fn start_command(&self) -> Result<CommandResponse, TransportError> {
        self.get_json(START_COMMAND_PATH).await
    }

    async fn get_count(&self) -> Result<CountResponse, TransportError> {
        self.get_json(GET_COUNT_PATH).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
