use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{RetentionRecord, Tenant, TenantContact};
use crate::types::Audience;

pub const TENANTS_TABLE: &str = "sell_local_tenants";
pub const RETENTION_TABLE: &str = "sell_local_deleted_tenants";

const TENANT_COLUMNS: &str = "id, slug, domain, name, owner_email, user_id, \
    stripe_customer_id, stripe_subscription_id, stripe_connect_account_id, \
    subscription_status, created_at";

const CONTACT_COLUMNS: &str = "owner_email, name, slug, domain, subscription_status, \
    subscription_ends_at, trial_ends_at";

/// Which rows of a dependent table belong to the tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// `column = id`
    Equals(Uuid),
    /// `column = ANY(ids)`; an empty set matches nothing.
    AnyOf(Vec<Uuid>),
}

impl KeyFilter {
    pub fn is_empty_set(&self) -> bool {
        matches!(self, KeyFilter::AnyOf(ids) if ids.is_empty())
    }
}

/// Backend store operations the tooling needs. Every call is a single
/// statement; there is no transaction spanning calls.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// All tenants whose owner email matches exactly, oldest first.
    async fn find_tenants_by_owner_email(&self, email: &str) -> Result<Vec<Tenant>, DatabaseError>;

    async fn retention_record_exists(&self, tenant_id: Uuid) -> Result<bool, DatabaseError>;

    async fn insert_retention_record(&self, record: &RetentionRecord) -> Result<(), DatabaseError>;

    /// `SELECT id FROM table WHERE column = tenant_id`
    async fn select_ids(&self, table: &str, column: &str, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    async fn count_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<i64, DatabaseError>;

    /// Bulk delete; returns the number of rows removed.
    async fn delete_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<u64, DatabaseError>;

    async fn list_audience(&self, audience: Audience, now: DateTime<Utc>) -> Result<Vec<TenantContact>, DatabaseError>;
}

pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_tenants_by_owner_email(&self, email: &str) -> Result<Vec<Tenant>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE owner_email = $1 ORDER BY created_at ASC",
            TENANT_COLUMNS,
            DatabaseManager::quote_identifier(TENANTS_TABLE)?
        );
        let tenants = sqlx::query_as::<Postgres, Tenant>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }

    async fn retention_record_exists(&self, tenant_id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE tenant_id = $1",
            DatabaseManager::quote_identifier(RETENTION_TABLE)?
        );
        let count = sqlx::query_scalar::<Postgres, i64>(&sql)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert_retention_record(&self, record: &RetentionRecord) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                tenant_id, slug, name, owner_email, user_id, domain,
                stripe_customer_id, stripe_subscription_id, stripe_connect_account_id,
                subscription_status, tenant_created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
            DatabaseManager::quote_identifier(RETENTION_TABLE)?
        );
        sqlx::query::<Postgres>(&sql)
            .bind(record.tenant_id)
            .bind(&record.slug)
            .bind(&record.name)
            .bind(&record.owner_email)
            .bind(record.user_id)
            .bind(&record.domain)
            .bind(&record.stripe_customer_id)
            .bind(&record.stripe_subscription_id)
            .bind(&record.stripe_connect_account_id)
            .bind(&record.subscription_status)
            .bind(record.tenant_created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn select_ids(&self, table: &str, column: &str, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = $1",
            DatabaseManager::quote_identifier(table)?,
            DatabaseManager::quote_identifier(column)?
        );
        let ids = sqlx::query_scalar::<Postgres, Uuid>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn count_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<i64, DatabaseError> {
        if key.is_empty_set() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            DatabaseManager::quote_identifier(table)?,
            key_predicate(column, key)?
        );
        let query = sqlx::query_scalar::<Postgres, i64>(&sql);
        let count = match key {
            KeyFilter::Equals(id) => query.bind(*id),
            KeyFilter::AnyOf(ids) => query.bind(ids.clone()),
        }
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn delete_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<u64, DatabaseError> {
        if key.is_empty_set() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            DatabaseManager::quote_identifier(table)?,
            key_predicate(column, key)?
        );
        let query = sqlx::query::<Postgres>(&sql);
        let result = match key {
            KeyFilter::Equals(id) => query.bind(*id),
            KeyFilter::AnyOf(ids) => query.bind(ids.clone()),
        }
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_audience(&self, audience: Audience, now: DateTime<Utc>) -> Result<Vec<TenantContact>, DatabaseError> {
        let (condition, uses_clock) = audience_filter(audience);
        let sql = audience_query(condition)?;

        let mut query = sqlx::query_as::<Postgres, TenantContact>(&sql);
        if uses_clock {
            query = query.bind(now);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

/// WHERE condition selecting an audience, and whether it binds the current
/// time as `$1`.
pub fn audience_filter(audience: Audience) -> (&'static str, bool) {
    match audience {
        Audience::NewDashboard => ("subscription_status = 'active'", false),
        Audience::ExpiredStore => (
            "subscription_status <> 'active' AND (trial_ends_at < $1 OR subscription_ends_at < $1)",
            true,
        ),
        Audience::FreeTierLaunch => ("subscription_status <> 'active' AND trial_ends_at < $1", true),
    }
}

fn audience_query(condition: &str) -> Result<String, DatabaseError> {
    Ok(format!(
        "SELECT {} FROM {} WHERE email_opt_in = TRUE AND {} ORDER BY created_at ASC",
        CONTACT_COLUMNS,
        DatabaseManager::quote_identifier(TENANTS_TABLE)?,
        condition
    ))
}

fn key_predicate(column: &str, key: &KeyFilter) -> Result<String, DatabaseError> {
    let column = DatabaseManager::quote_identifier(column)?;
    Ok(match key {
        KeyFilter::Equals(_) => format!("{} = $1", column),
        KeyFilter::AnyOf(_) => format!("{} = ANY($1)", column),
    })
}
