//! Tenant offboarding: archive, tear down external resources, then delete
//! every row reachable from the tenant in dependency order.
//!
//! The workflow runs strictly in sequence, one call at a time. Each step ends
//! in a [`StepOutcome`]; only a fatal outcome stops the remaining steps.
pub mod plan;


use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::{DatabaseError, KeyFilter, RetentionRecord, Tenant, TenantStore};
use crate::services::{DomainRemoval, DomainRouter, IdentityProvider, ObjectStorage, UserRemoval};
use crate::types::RunMode;
pub use plan::{DeletionPlan, DeletionRule, KeySet, PlanError, Resolution};

pub const STORAGE_BUCKET: &str = "images";
pub const GALLERY_PREFIX: &str = "gallery";

/// Object prefix holding a tenant's gallery uploads.
pub fn gallery_prefix(tenant_id: Uuid) -> String {
    format!("{}/{}", GALLERY_PREFIX, tenant_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Archive,
    Domain,
    Storage,
    Records,
    Identity,
}

impl Step {
    /// Step number as shown to operators; the lookup is step 1.
    pub fn number(self) -> u8 {
        match self {
            Step::Archive => 2,
            Step::Domain => 3,
            Step::Storage => 4,
            Step::Records => 5,
            Step::Identity => 6,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Archive => "Archive tenant to sell_local_deleted_tenants",
            Step::Domain => "Remove custom domain",
            Step::Storage => "Delete storage files",
            Step::Records => "Delete database records",
            Step::Identity => "Delete auth user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded(String),
    /// Nothing to do, or a dry run describing what it would have done.
    Skipped(String),
    FailedNonFatal(String),
    FailedFatal(String),
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::FailedFatal(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            StepOutcome::Succeeded(d)
            | StepOutcome::Skipped(d)
            | StepOutcome::FailedNonFatal(d)
            | StepOutcome::FailedFatal(d) => d,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
    /// Supporting lines, e.g. archived fields or file paths.
    pub details: Vec<String>,
}

impl StepReport {
    fn new(step: Step, outcome: StepOutcome) -> Self {
        Self { step, outcome, details: Vec::new() }
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: &'static str,
    pub resolution: &'static str,
    pub matched: i64,
    /// Rows removed; `None` when skipped or in a dry run.
    pub deleted: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OffboardReport {
    pub tenant_id: Uuid,
    pub tenant_name: Option<String>,
    pub owner_email: String,
    pub mode: RunMode,
    pub steps: Vec<StepReport>,
    pub tables: Vec<TableReport>,
}

impl OffboardReport {
    fn new(tenant: &Tenant, mode: RunMode) -> Self {
        Self {
            tenant_id: tenant.id,
            tenant_name: tenant.name.clone(),
            owner_email: tenant.owner_email.clone(),
            mode,
            steps: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Log and keep a step's report. Returns true when the step was fatal.
    fn record(&mut self, report: StepReport) -> bool {
        let tenant_id = self.tenant_id;
        let step = report.step.title();
        match &report.outcome {
            StepOutcome::Succeeded(d) | StepOutcome::Skipped(d) => info!(%tenant_id, step, "{}", d),
            StepOutcome::FailedNonFatal(d) => warn!(%tenant_id, step, "{}", d),
            StepOutcome::FailedFatal(d) => error!(%tenant_id, step, "{}", d),
        }
        let fatal = report.outcome.is_fatal();
        self.steps.push(report);
        fatal
    }

    pub fn rows_deleted(&self) -> u64 {
        self.tables.iter().filter_map(|t| t.deleted).sum()
    }
}

#[derive(Debug, Error)]
pub enum OffboardError {
    #[error("No tenant found with owner_email = {0}")]
    NotFound(String),

    #[error("Tenant lookup failed: {0}")]
    Lookup(#[from] DatabaseError),

    #[error("Invalid deletion plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Aborted at step {} ({}): {message}", .step.number(), .step.title())]
    Aborted {
        step: Step,
        message: String,
        report: Box<OffboardReport>,
    },
}

impl OffboardError {
    fn aborted(report: OffboardReport) -> Self {
        let (step, message) = report
            .steps
            .last()
            .map(|s| (s.step, s.outcome.detail().to_string()))
            .unwrap_or((Step::Archive, String::new()));
        OffboardError::Aborted { step, message, report: Box::new(report) }
    }
}

/// Find the tenant owned by `email`. With several matches the oldest wins.
pub async fn locate_tenant(store: &dyn TenantStore, email: &str) -> Result<Tenant, OffboardError> {
    let mut matches = store.find_tenants_by_owner_email(email).await?;
    if matches.len() > 1 {
        warn!(
            owner_email = email,
            matches = matches.len(),
            "Several tenants share this owner email; using the oldest"
        );
    }
    if matches.is_empty() {
        return Err(OffboardError::NotFound(email.to_string()));
    }
    Ok(matches.swap_remove(0))
}

/// One-shot orchestrator over the backend store and the external systems.
pub struct Offboarder {
    store: Arc<dyn TenantStore>,
    domains: Option<Arc<dyn DomainRouter>>,
    storage: Arc<dyn ObjectStorage>,
    identity: Arc<dyn IdentityProvider>,
    plan: DeletionPlan,
}

impl Offboarder {
    /// `domains` is `None` when routing credentials are not configured.
    pub fn new(
        store: Arc<dyn TenantStore>,
        domains: Option<Arc<dyn DomainRouter>>,
        storage: Arc<dyn ObjectStorage>,
        identity: Arc<dyn IdentityProvider>,
        plan: DeletionPlan,
    ) -> Self {
        Self { store, domains, storage, identity, plan }
    }

    pub fn plan(&self) -> &DeletionPlan {
        &self.plan
    }

    pub async fn locate(&self, email: &str) -> Result<Tenant, OffboardError> {
        locate_tenant(self.store.as_ref(), email).await
    }

    /// Run steps 2-6 for an already located tenant.
    pub async fn execute(&self, tenant: &Tenant, mode: RunMode) -> Result<OffboardReport, OffboardError> {
        let mut report = OffboardReport::new(tenant, mode);

        let step = self.archive(tenant, mode).await;
        if report.record(step) {
            return Err(OffboardError::aborted(report));
        }

        let step = self.remove_domain(tenant, mode).await;
        report.record(step);

        let step = self.remove_storage(tenant, mode).await;
        report.record(step);

        let (step, tables) = self.delete_records(tenant, mode).await;
        report.tables = tables;
        if report.record(step) {
            return Err(OffboardError::aborted(report));
        }

        let step = self.delete_identity(tenant, mode).await;
        report.record(step);

        Ok(report)
    }

    async fn archive(&self, tenant: &Tenant, mode: RunMode) -> StepReport {
        let record = RetentionRecord::from(tenant);
        let fields: Vec<String> = record
            .display_fields()
            .into_iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();

        let exists = match self.store.retention_record_exists(tenant.id).await {
            Ok(exists) => exists,
            Err(e) => {
                return StepReport::new(
                    Step::Archive,
                    StepOutcome::FailedFatal(format!("Could not check for an existing archive: {}", e)),
                )
            }
        };
        if exists {
            return StepReport::new(
                Step::Archive,
                StepOutcome::Skipped("Tenant already archived".to_string()),
            );
        }

        if mode.is_dry_run() {
            return StepReport::new(
                Step::Archive,
                StepOutcome::Skipped("Would archive tenant info".to_string()),
            )
            .with_details(fields);
        }

        match self.store.insert_retention_record(&record).await {
            Ok(()) => StepReport::new(Step::Archive, StepOutcome::Succeeded("Archived tenant info".to_string()))
                .with_details(fields),
            Err(e) => StepReport::new(
                Step::Archive,
                StepOutcome::FailedFatal(format!("Archive write failed: {}", e)),
            ),
        }
    }

    async fn remove_domain(&self, tenant: &Tenant, mode: RunMode) -> StepReport {
        let domain = match tenant.domain.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => {
                return StepReport::new(
                    Step::Domain,
                    StepOutcome::Skipped("No custom domain to remove".to_string()),
                )
            }
        };
        let Some(domains) = &self.domains else {
            return StepReport::new(
                Step::Domain,
                StepOutcome::Skipped("Routing credentials not configured, skipping domain removal".to_string()),
            );
        };

        if mode.is_dry_run() {
            return StepReport::new(
                Step::Domain,
                StepOutcome::Skipped(format!("Would remove domain: {}", domain)),
            );
        }

        let outcome = match domains.remove_domain(domain).await {
            Ok(DomainRemoval::Removed) => StepOutcome::Succeeded(format!("Removed domain: {}", domain)),
            Ok(DomainRemoval::NotFound) => {
                StepOutcome::Succeeded(format!("Domain not found (already removed?): {}", domain))
            }
            Err(e) => StepOutcome::FailedNonFatal(format!("Domain removal failed: {}", e)),
        };
        StepReport::new(Step::Domain, outcome)
    }

    async fn remove_storage(&self, tenant: &Tenant, mode: RunMode) -> StepReport {
        let prefix = gallery_prefix(tenant.id);

        let objects = match self.storage.list(STORAGE_BUCKET, &prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                return StepReport::new(
                    Step::Storage,
                    StepOutcome::FailedNonFatal(format!("Could not list storage files ({})", e)),
                )
            }
        };

        let paths: Vec<String> = objects
            .into_iter()
            .filter_map(|o| o.name)
            .filter(|name| !name.is_empty())
            .map(|name| format!("{}/{}", prefix, name))
            .collect();

        if paths.is_empty() {
            return StepReport::new(Step::Storage, StepOutcome::Skipped("No storage files found".to_string()));
        }

        let found = format!("Found {} file(s) in {}/{}", paths.len(), STORAGE_BUCKET, prefix);
        if mode.is_dry_run() {
            let details = paths.iter().map(|p| format!("Would delete: {}", p)).collect();
            return StepReport::new(Step::Storage, StepOutcome::Skipped(found)).with_details(details);
        }

        let outcome = match self.storage.remove(STORAGE_BUCKET, &paths).await {
            Ok(()) => StepOutcome::Succeeded(format!("{}; deleted {} file(s)", found, paths.len())),
            Err(e) => StepOutcome::FailedNonFatal(format!("{}; storage deletion error: {}", found, e)),
        };
        StepReport::new(Step::Storage, outcome)
    }

    async fn delete_records(&self, tenant: &Tenant, mode: RunMode) -> (StepReport, Vec<TableReport>) {
        let mut tables = Vec::with_capacity(self.plan.rules().len());

        // Resolve intermediate ids before anything references them.
        let mut key_sets: HashMap<KeySet, Vec<Uuid>> = HashMap::new();
        for &set in self.plan.key_sets() {
            let (table, column) = set.source();
            match self.store.select_ids(table, column, tenant.id).await {
                Ok(ids) => {
                    key_sets.insert(set, ids);
                }
                Err(e) => {
                    let outcome = StepOutcome::FailedFatal(format!("Could not resolve {} ids: {}", set.name(), e));
                    return (StepReport::new(Step::Records, outcome), tables);
                }
            }
        }

        let mut matched_total = 0i64;
        let mut deleted_total = 0u64;
        let mut details = Vec::new();

        for rule in self.plan.rules() {
            let key = match rule.resolution {
                Resolution::Direct => KeyFilter::Equals(tenant.id),
                Resolution::Via(set) => KeyFilter::AnyOf(key_sets.get(&set).cloned().unwrap_or_default()),
            };

            let matched = match self.store.count_rows(rule.table, rule.column, &key).await {
                Ok(n) => n,
                Err(e) => {
                    let outcome = StepOutcome::FailedFatal(format!("{}: count failed: {}", rule.table, e));
                    return (StepReport::new(Step::Records, outcome).with_details(details), tables);
                }
            };

            let mut table = TableReport {
                table: rule.table,
                resolution: rule.resolution.label(),
                matched,
                deleted: None,
            };

            if matched == 0 {
                details.push(format!("{}: 0 rows (skip)", rule.table));
                tables.push(table);
                continue;
            }
            matched_total += matched;

            if mode.is_dry_run() {
                details.push(format!("{}: {} row(s) would be deleted", rule.table, matched));
                tables.push(table);
                continue;
            }

            match self.store.delete_rows(rule.table, rule.column, &key).await {
                Ok(deleted) => {
                    details.push(format!("{}: deleted {} row(s)", rule.table, deleted));
                    deleted_total += deleted;
                    table.deleted = Some(deleted);
                    tables.push(table);
                }
                Err(e) => {
                    tables.push(table);
                    let outcome = StepOutcome::FailedFatal(format!(
                        "{}: delete failed after {} row(s) were removed: {}",
                        rule.table, deleted_total, e
                    ));
                    return (StepReport::new(Step::Records, outcome).with_details(details), tables);
                }
            }
        }

        let outcome = if matched_total == 0 {
            StepOutcome::Skipped("No rows found".to_string())
        } else if mode.is_dry_run() {
            StepOutcome::Skipped(format!("{} row(s) would be deleted", matched_total))
        } else {
            StepOutcome::Succeeded(format!("Deleted {} row(s)", deleted_total))
        };
        (StepReport::new(Step::Records, outcome).with_details(details), tables)
    }

    async fn delete_identity(&self, tenant: &Tenant, mode: RunMode) -> StepReport {
        let Some(user_id) = tenant.user_id else {
            return StepReport::new(
                Step::Identity,
                StepOutcome::Skipped("No user_id on tenant, skipping auth deletion".to_string()),
            );
        };

        if mode.is_dry_run() {
            return StepReport::new(
                Step::Identity,
                StepOutcome::Skipped(format!("Would delete auth user: {}", user_id)),
            );
        }

        let outcome = match self.identity.delete_user(user_id).await {
            Ok(UserRemoval::Removed) => StepOutcome::Succeeded(format!("Deleted auth user: {}", user_id)),
            Ok(UserRemoval::NotFound) => StepOutcome::Skipped(format!("Auth user already removed: {}", user_id)),
            Err(e) => StepOutcome::FailedNonFatal(format!("Auth user deletion failed: {}", e)),
        };
        StepReport::new(Step::Identity, outcome)
    }
}
