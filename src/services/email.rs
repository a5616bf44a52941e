use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::http::{endpoint, ensure_success, ClientError};

/// A single transactional email, serialized as the Resend `POST /emails` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Transactional email API.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message and return the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ClientError>;
}

pub struct ResendClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ResendClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ClientError> {
        let url = endpoint(&self.api_base, &["emails"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;
        let sent: SendResponse = ensure_success(response).await?.json().await?;
        Ok(sent.id)
    }
}
