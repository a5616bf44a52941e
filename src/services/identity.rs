use async_trait::async_trait;
use reqwest::StatusCode;
use uuid::Uuid;

use crate::config::PlatformConfig;
use crate::services::http::{endpoint, ensure_success, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRemoval {
    Removed,
    /// No such user; already deleted.
    NotFound,
}

/// Authentication provider holding the tenant owner's login.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn delete_user(&self, user_id: Uuid) -> Result<UserRemoval, ClientError>;
}

/// Supabase GoTrue admin API.
pub struct SupabaseAuthAdmin {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl SupabaseAuthAdmin {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthAdmin {
    async fn delete_user(&self, user_id: Uuid) -> Result<UserRemoval, ClientError> {
        let id = user_id.to_string();
        let url = endpoint(&self.config.url, &["auth", "v1", "admin", "users", &id])?;
        let response = self
            .http
            .delete(url)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(UserRemoval::NotFound);
        }
        ensure_success(response).await?;
        Ok(UserRemoval::Removed)
    }
}
