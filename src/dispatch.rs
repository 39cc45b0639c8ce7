//! Delivery of rendered payloads to the messaging provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::render::NotificationPayload;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request never got a response (connect failure, timeout, ...).
    /// The URL is stripped since it carries the auth key.
    #[error("provider request failed: {0}")]
    Transport(reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The provider answered 2xx but the body was not JSON.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl DispatchError {
    fn transport(e: reqwest::Error) -> Self {
        DispatchError::Transport(e.without_url())
    }
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Submits the payload and returns the provider's response body as-is.
    async fn dispatch(&self, payload: &NotificationPayload) -> Result<Value, DispatchError>;
}

/// HTTP client for the MsgClub WhatsApp endpoint.
pub struct MsgClubClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MsgClubClient {
    /// `endpoint` is the full URL, including the query-string credential.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(DispatchError::transport)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Dispatcher for MsgClubClient {
    #[instrument(level = "debug", skip_all, fields(to = %payload.mobile_numbers))]
    async fn dispatch(&self, payload: &NotificationPayload) -> Result<Value, DispatchError> {
        info!("Submitting template message to provider");

        let response = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(DispatchError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(DispatchError::transport)?;
        debug!(status = status.as_u16(), "Provider responded: {}", body);

        if !status.is_success() {
            let message = rejection_message(status.as_u16(), &body);
            error!(status = status.as_u16(), "Provider rejected message: {}", message);
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Provider returned a non-JSON body: {}", e);
            DispatchError::MalformedResponse(e.to_string())
        })
    }
}

/// Picks the most useful description out of an error response body.
fn rejection_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(Value::String(text)) = fields.get(key) {
                if !text.is_empty() {
                    return text.clone();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("provider returned status {}", status)
    } else {
        trimmed.to_string()
    }
}
