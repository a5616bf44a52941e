use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::config::RoutingConfig;
use crate::services::http::{endpoint, ensure_success, ClientError};

/// The only vendor call with a bound on how long it may take.
pub const DOMAIN_REMOVAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainRemoval {
    Removed,
    /// The routing service no longer knows the domain.
    NotFound,
}

/// Domain-routing service that serves tenants' custom domains.
#[async_trait]
pub trait DomainRouter: Send + Sync {
    async fn remove_domain(&self, domain: &str) -> Result<DomainRemoval, ClientError>;
}

pub struct VercelDomains {
    http: reqwest::Client,
    config: RoutingConfig,
}

impl VercelDomains {
    pub fn new(config: RoutingConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(DOMAIN_REMOVAL_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl DomainRouter for VercelDomains {
    async fn remove_domain(&self, domain: &str) -> Result<DomainRemoval, ClientError> {
        let mut url = endpoint(
            &self.config.api_base,
            &["v10", "projects", &self.config.project_id, "domains", domain],
        )?;
        if let Some(team_id) = &self.config.team_id {
            url.query_pairs_mut().append_pair("teamId", team_id);
        }

        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DomainRemoval::NotFound);
        }
        ensure_success(response).await?;
        Ok(DomainRemoval::Removed)
    }
}
