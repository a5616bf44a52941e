use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A storefront account row from `sell_local_tenants`. Only `id`, `owner_email`
/// and `created_at` are assumed NOT NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub owner_email: String,
    pub user_id: Option<Uuid>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_connect_account_id: Option<String>,
    pub subscription_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Labelled fields shown to the operator before anything is deleted.
    pub fn summary_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.to_string()),
            ("Slug", or_none(self.slug.clone())),
            ("Domain", or_none(self.domain.clone())),
            ("Name", or_none(self.name.clone())),
            ("Owner Email", self.owner_email.clone()),
            ("User ID", or_none(self.user_id.map(|id| id.to_string()))),
            ("Subscription Status", or_none(self.subscription_status.clone())),
        ]
    }
}

/// Point-in-time copy of a tenant's identity and billing fields, written to
/// `sell_local_deleted_tenants` before anything is removed.
///
/// Absent values are stored as NULL columns rather than left out of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RetentionRecord {
    pub tenant_id: Uuid,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub owner_email: String,
    pub user_id: Option<Uuid>,
    pub domain: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_connect_account_id: Option<String>,
    pub subscription_status: Option<String>,
    pub tenant_created_at: DateTime<Utc>,
}

impl From<&Tenant> for RetentionRecord {
    fn from(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id,
            slug: tenant.slug.clone(),
            name: tenant.name.clone(),
            owner_email: tenant.owner_email.clone(),
            user_id: tenant.user_id,
            domain: tenant.domain.clone(),
            stripe_customer_id: tenant.stripe_customer_id.clone(),
            stripe_subscription_id: tenant.stripe_subscription_id.clone(),
            stripe_connect_account_id: tenant.stripe_connect_account_id.clone(),
            subscription_status: tenant.subscription_status.clone(),
            tenant_created_at: tenant.created_at,
        }
    }
}

impl RetentionRecord {
    /// Field/value pairs in column order, with `(none)` for absent values.
    pub fn display_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tenant_id", self.tenant_id.to_string()),
            ("slug", or_none(self.slug.clone())),
            ("name", or_none(self.name.clone())),
            ("owner_email", self.owner_email.clone()),
            ("user_id", or_none(self.user_id.map(|id| id.to_string()))),
            ("domain", or_none(self.domain.clone())),
            ("stripe_customer_id", or_none(self.stripe_customer_id.clone())),
            ("stripe_subscription_id", or_none(self.stripe_subscription_id.clone())),
            ("stripe_connect_account_id", or_none(self.stripe_connect_account_id.clone())),
            ("subscription_status", or_none(self.subscription_status.clone())),
            ("tenant_created_at", self.tenant_created_at.to_rfc3339()),
        ]
    }
}

/// Tenant fields selected for campaign audiences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TenantContact {
    pub owner_email: String,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

pub fn or_none(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "(none)".to_string(),
    }
}
