//! Observation submission over HTTP

use crate::auth::AuthHeader;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while posting one observation
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Destination for observation bodies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObservationSink: Send + Sync {
    /// POST `body` to `url`, returning the 2xx status on success
    async fn submit(&self, url: &str, body: &Value) -> Result<u16, SubmissionError>;
}

/// Posts observations with the shared bearer header
pub struct HttpObservationSink {
    client: reqwest::Client,
    auth: Arc<AuthHeader>,
}

impl HttpObservationSink {
    /// Create a sink whose requests give up after `timeout`
    pub fn new(timeout: Duration, auth: Arc<AuthHeader>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, auth })
    }
}

#[async_trait]
impl ObservationSink for HttpObservationSink {
    async fn submit(&self, url: &str, body: &Value) -> Result<u16, SubmissionError> {
        let mut request = self.client.post(url).json(body);
        if let Some(value) = self.auth.value() {
            request = request.header(AUTHORIZATION, value);
        }

        let status = request.send().await?.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(SubmissionError::Status(status.as_u16()))
        }
    }
}
