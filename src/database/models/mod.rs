pub mod tenant;

pub use tenant::{or_none, RetentionRecord, Tenant, TenantContact};
