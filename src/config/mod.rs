use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub platform: Option<PlatformConfig>,
    pub routing: Option<RoutingConfig>,
    pub email: EmailConfig,
    pub campaigns: CampaignConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Supabase project endpoint used for object storage and the auth admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub url: String,
    pub service_role_key: String,
}

/// Vercel project that carries the tenants' custom domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub api_base: String,
    pub api_token: String,
    pub project_id: String,
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub from_email: Option<String>,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub campaigns_dir: PathBuf,
    pub base_domain: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            database: DatabaseConfig {
                url: None,
                max_connections: 2,
                connection_timeout: 30,
            },
            platform: None,
            routing: None,
            email: EmailConfig {
                api_base: "https://api.resend.com".to_string(),
                api_key: None,
                from_email: None,
                reply_to: None,
            },
            campaigns: CampaignConfig {
                campaigns_dir: PathBuf::from("emails").join("campaigns"),
                base_domain: "selllocal.app".to_string(),
            },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        self.database.url = non_empty("DATABASE_URL");
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Platform (storage + identity)
        if let (Some(url), Some(service_role_key)) =
            (non_empty("SUPABASE_URL"), non_empty("SUPABASE_SERVICE_ROLE_KEY"))
        {
            self.platform = Some(PlatformConfig { url, service_role_key });
        }

        // Routing is optional; domain teardown becomes a no-op without it
        if let (Some(api_token), Some(project_id)) =
            (non_empty("VERCEL_API_TOKEN"), non_empty("SELLLOCAL_VERCEL_PROJECT_ID"))
        {
            self.routing = Some(RoutingConfig {
                api_base: non_empty("VERCEL_API_BASE")
                    .unwrap_or_else(|| "https://api.vercel.com".to_string()),
                api_token,
                project_id,
                team_id: non_empty("VERCEL_TEAM_ID"),
            });
        }

        // Email overrides
        if let Some(v) = non_empty("RESEND_API_BASE") {
            self.email.api_base = v;
        }
        self.email.api_key = non_empty("RESEND_API_KEY");
        self.email.from_email = non_empty("FROM_EMAIL");
        self.email.reply_to = non_empty("REPLY_TO");

        // Campaign overrides
        if let Some(v) = non_empty("CAMPAIGNS_DIR") {
            self.campaigns.campaigns_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty("STOREFRONT_BASE_DOMAIN") {
            self.campaigns.base_domain = v;
        }

        self
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database
            .url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn require_platform(&self) -> Result<&PlatformConfig, ConfigError> {
        self.platform
            .as_ref()
            .ok_or(ConfigError::Missing("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY"))
    }
}

impl EmailConfig {
    /// Credentials needed for live sends: (api key, from address).
    pub fn require_sender(&self) -> Result<(&str, &str), ConfigError> {
        let key = self.api_key.as_deref().ok_or(ConfigError::Missing("RESEND_API_KEY"))?;
        let from = self.from_email.as_deref().ok_or(ConfigError::Missing("FROM_EMAIL"))?;
        Ok((key, from))
    }
}

/// Treat empty values the same as unset ones.
fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
