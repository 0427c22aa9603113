//! Reqwest-backed availability feed adapter.
//!
//! Owns transport details only: timeout and status mapping plus payload
//! decoding. Reconciliation against the store happens in the domain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, warn};

use super::dto::AvailabilityResponseDto;
use crate::domain::ports::{AvailabilityBatch, AvailabilityFeed, AvailabilityFeedError};

/// Browser-like agent sent when no custom agent is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Feed adapter issuing one GET per fetch against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct AvailabilityHttpFeed {
    client: Client,
    endpoint: Url,
    user_agent: String,
}

impl AvailabilityHttpFeed {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_user_agent(endpoint, timeout, DEFAULT_USER_AGENT)
    }

    /// Build an adapter sending a custom `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_user_agent(
        endpoint: Url,
        timeout: Duration,
        user_agent: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            user_agent: user_agent.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AvailabilityFeed for AvailabilityHttpFeed {
    async fn fetch_availability(&self) -> Result<AvailabilityBatch, AvailabilityFeedError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status));
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(bytes = body.len(), "availability payload received");
        parse_batch(body.as_ref())
    }
}

fn parse_batch(body: &[u8]) -> Result<AvailabilityBatch, AvailabilityFeedError> {
    let decoded: AvailabilityResponseDto = serde_json::from_slice(body).map_err(|error| {
        AvailabilityFeedError::decode(format!("invalid availability JSON payload: {error}"))
    })?;
    let (batch, reasons) = decoded
        .into_batch()
        .map_err(AvailabilityFeedError::decode)?;
    for reason in &reasons {
        warn!(%reason, "rejected availability record");
    }
    Ok(batch)
}

fn map_transport_error(error: reqwest::Error) -> AvailabilityFeedError {
    if error.is_timeout() {
        AvailabilityFeedError::timeout(error.to_string())
    } else if error.is_decode() {
        AvailabilityFeedError::decode(error.to_string())
    } else {
        AvailabilityFeedError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode) -> AvailabilityFeedError {
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AvailabilityFeedError::timeout(format!("status {}", status.as_u16()))
        }
        _ => AvailabilityFeedError::status(status.as_u16()),
    }
}
