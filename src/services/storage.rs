use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::PlatformConfig;
use crate::services::http::{endpoint, ensure_success, ClientError};

const LIST_PAGE_SIZE: usize = 1000;

/// One entry returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageObject {
    #[serde(default)]
    pub name: Option<String>,
}

/// Object storage holding tenant uploads.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Entries directly under `prefix` in `bucket`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StorageObject>, ClientError>;

    /// Remove the given object paths in a single batch call.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), ClientError>;
}

/// Supabase Storage REST API.
pub struct SupabaseStorage {
    http: reqwest::Client,
    config: PlatformConfig,
}

impl SupabaseStorage {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StorageObject>, ClientError> {
        let url = endpoint(&self.config.url, &["storage", "v1", "object", "list", bucket])?;
        let mut objects = Vec::new();
        let mut offset = 0;

        loop {
            let body = json!({
                "prefix": prefix,
                "limit": LIST_PAGE_SIZE,
                "offset": offset,
                "sortBy": { "column": "name", "order": "asc" },
            });
            let response = self
                .authorized(self.http.post(url.clone()))
                .json(&body)
                .send()
                .await?;
            let page: Vec<StorageObject> = ensure_success(response).await?.json().await?;
            let fetched = page.len();
            objects.extend(page);

            if fetched < LIST_PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        Ok(objects)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), ClientError> {
        let url = endpoint(&self.config.url, &["storage", "v1", "object", bucket])?;
        let response = self
            .authorized(self.http.delete(url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
