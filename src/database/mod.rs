pub mod manager;
pub mod models;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{or_none, RetentionRecord, Tenant, TenantContact};
pub use repository::{KeyFilter, PgTenantStore, TenantStore, RETENTION_TABLE, TENANTS_TABLE};
