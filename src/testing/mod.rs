//! In-memory fakes for every collaborator trait, sharing one ordered call log.
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::database::{
    DatabaseError, KeyFilter, RetentionRecord, Tenant, TenantContact, TenantStore, TENANTS_TABLE,
};
use crate::services::{
    ClientError, DomainRemoval, DomainRouter, EmailSender, IdentityProvider, ObjectStorage, OutgoingEmail,
    StorageObject, UserRemoval,
};
use crate::types::Audience;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindTenants(String),
    RetentionExists(Uuid),
    InsertRetention(Uuid),
    SelectIds(String),
    CountRows(String),
    DeleteRows { table: String, rows: u64 },
    ListAudience(Audience),
    RemoveDomain(String),
    ListStorage(String),
    RemoveStorage(Vec<String>),
    DeleteUser(Uuid),
    SendEmail(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::InsertRetention(_)
                | Call::DeleteRows { .. }
                | Call::RemoveDomain(_)
                | Call::RemoveStorage(_)
                | Call::DeleteUser(_)
                | Call::SendEmail(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

fn injected() -> ClientError {
    ClientError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "injected failure".to_string(),
    }
}

pub fn timestamp(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A tenant with every optional field populated.
pub fn sample_tenant(email: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        slug: Some("green-acres".to_string()),
        domain: Some("x.example.com".to_string()),
        name: Some("Green Acres".to_string()),
        owner_email: email.to_string(),
        user_id: Some(Uuid::new_v4()),
        stripe_customer_id: Some("cus_123".to_string()),
        stripe_subscription_id: Some("sub_123".to_string()),
        stripe_connect_account_id: Some("acct_123".to_string()),
        subscription_status: Some("active".to_string()),
        created_at: timestamp(2024, 2, 1),
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTenant {
    pub tenant: Tenant,
    pub email_opt_in: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct MemoryRow {
    id: Uuid,
    columns: HashMap<String, Uuid>,
}

#[derive(Default)]
struct MemoryState {
    tenants: Vec<MemoryTenant>,
    retention: Vec<RetentionRecord>,
    rows: HashMap<String, Vec<MemoryRow>>,
    fail_retention: bool,
    fail_delete_on: Option<String>,
}

fn key_matches(value: Option<&Uuid>, key: &KeyFilter) -> bool {
    match (value, key) {
        (Some(v), KeyFilter::Equals(id)) => v == id,
        (Some(v), KeyFilter::AnyOf(ids)) => ids.contains(v),
        (None, _) => false,
    }
}

pub struct MemoryStore {
    log: CallLog,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(log: CallLog) -> Self {
        Self { log, state: Mutex::new(MemoryState::default()) }
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.add_member(MemoryTenant {
            tenant,
            email_opt_in: true,
            trial_ends_at: None,
            subscription_ends_at: None,
        });
    }

    pub fn add_member(&self, member: MemoryTenant) {
        self.state.lock().unwrap().tenants.push(member);
    }

    /// Insert a row into a dependent table; returns its id.
    pub fn add_row(&self, table: &str, columns: &[(&str, Uuid)]) -> Uuid {
        let id = Uuid::new_v4();
        let row = MemoryRow {
            id,
            columns: columns.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        };
        self.state.lock().unwrap().rows.entry(table.to_string()).or_default().push(row);
        id
    }

    pub fn row_count(&self, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        if table == TENANTS_TABLE {
            return state.tenants.len();
        }
        state.rows.get(table).map(Vec::len).unwrap_or(0)
    }

    pub fn retention_records(&self) -> Vec<RetentionRecord> {
        self.state.lock().unwrap().retention.clone()
    }

    pub fn fail_retention_insert(&self) {
        self.state.lock().unwrap().fail_retention = true;
    }

    pub fn fail_deletes_on(&self, table: &str) {
        self.state.lock().unwrap().fail_delete_on = Some(table.to_string());
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_tenants_by_owner_email(&self, email: &str) -> Result<Vec<Tenant>, DatabaseError> {
        self.log.push(Call::FindTenants(email.to_string()));
        let state = self.state.lock().unwrap();
        let mut found: Vec<Tenant> = state
            .tenants
            .iter()
            .filter(|m| m.tenant.owner_email == email)
            .map(|m| m.tenant.clone())
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    async fn retention_record_exists(&self, tenant_id: Uuid) -> Result<bool, DatabaseError> {
        self.log.push(Call::RetentionExists(tenant_id));
        Ok(self.state.lock().unwrap().retention.iter().any(|r| r.tenant_id == tenant_id))
    }

    async fn insert_retention_record(&self, record: &RetentionRecord) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_retention {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        self.log.push(Call::InsertRetention(record.tenant_id));
        state.retention.push(record.clone());
        Ok(())
    }

    async fn select_ids(&self, table: &str, column: &str, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        self.log.push(Call::SelectIds(table.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.columns.get(column) == Some(&tenant_id))
                    .map(|r| r.id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<i64, DatabaseError> {
        self.log.push(Call::CountRows(table.to_string()));
        let state = self.state.lock().unwrap();
        let count = if table == TENANTS_TABLE {
            state.tenants.iter().filter(|m| key_matches(Some(&m.tenant.id), key)).count()
        } else {
            state
                .rows
                .get(table)
                .map(|rows| rows.iter().filter(|r| key_matches(r.columns.get(column), key)).count())
                .unwrap_or(0)
        };
        Ok(count as i64)
    }

    async fn delete_rows(&self, table: &str, column: &str, key: &KeyFilter) -> Result<u64, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_on.as_deref() == Some(table) {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let removed = if table == TENANTS_TABLE {
            let before = state.tenants.len();
            state.tenants.retain(|m| !key_matches(Some(&m.tenant.id), key));
            before - state.tenants.len()
        } else {
            let rows = state.rows.entry(table.to_string()).or_default();
            let before = rows.len();
            rows.retain(|r| !key_matches(r.columns.get(column), key));
            before - rows.len()
        };
        self.log.push(Call::DeleteRows { table: table.to_string(), rows: removed as u64 });
        Ok(removed as u64)
    }

    /// Same rules as `audience_filter`; a NULL status never matches `<> 'active'`.
    async fn list_audience(&self, audience: Audience, now: DateTime<Utc>) -> Result<Vec<TenantContact>, DatabaseError> {
        self.log.push(Call::ListAudience(audience));
        let state = self.state.lock().unwrap();
        let before_now = |t: Option<DateTime<Utc>>| t.map(|t| t < now).unwrap_or(false);

        let mut members: Vec<&MemoryTenant> = state
            .tenants
            .iter()
            .filter(|m| m.email_opt_in)
            .filter(|m| {
                let status = m.tenant.subscription_status.as_deref();
                match audience {
                    Audience::NewDashboard => status == Some("active"),
                    Audience::ExpiredStore => {
                        status.is_some()
                            && status != Some("active")
                            && (before_now(m.trial_ends_at) || before_now(m.subscription_ends_at))
                    }
                    Audience::FreeTierLaunch => {
                        status.is_some() && status != Some("active") && before_now(m.trial_ends_at)
                    }
                }
            })
            .collect();
        members.sort_by_key(|m| m.tenant.created_at);

        Ok(members
            .into_iter()
            .map(|m| TenantContact {
                owner_email: m.tenant.owner_email.clone(),
                name: m.tenant.name.clone(),
                slug: m.tenant.slug.clone(),
                domain: m.tenant.domain.clone(),
                subscription_status: m.tenant.subscription_status.clone(),
                subscription_ends_at: m.subscription_ends_at,
                trial_ends_at: m.trial_ends_at,
            })
            .collect())
    }
}

pub struct FakeDomains {
    log: CallLog,
    known: Mutex<HashSet<String>>,
    fail: bool,
}

impl FakeDomains {
    pub fn new(log: CallLog, known: &[&str]) -> Self {
        Self {
            log,
            known: Mutex::new(known.iter().map(|d| d.to_string()).collect()),
            fail: false,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, known: Mutex::new(HashSet::new()), fail: true }
    }
}

#[async_trait]
impl DomainRouter for FakeDomains {
    async fn remove_domain(&self, domain: &str) -> Result<DomainRemoval, ClientError> {
        self.log.push(Call::RemoveDomain(domain.to_string()));
        if self.fail {
            return Err(injected());
        }
        if self.known.lock().unwrap().remove(domain) {
            Ok(DomainRemoval::Removed)
        } else {
            Ok(DomainRemoval::NotFound)
        }
    }
}

pub struct FakeStorage {
    log: CallLog,
    objects: Mutex<HashMap<String, Vec<String>>>,
    fail_list: bool,
}

impl FakeStorage {
    pub fn new(log: CallLog) -> Self {
        Self { log, objects: Mutex::new(HashMap::new()), fail_list: false }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, objects: Mutex::new(HashMap::new()), fail_list: true }
    }

    pub fn put(&self, prefix: &str, name: &str) {
        self.objects.lock().unwrap().entry(prefix.to_string()).or_default().push(name.to_string());
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.objects.lock().unwrap().get(prefix).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn list(&self, _bucket: &str, prefix: &str) -> Result<Vec<StorageObject>, ClientError> {
        self.log.push(Call::ListStorage(prefix.to_string()));
        if self.fail_list {
            return Err(injected());
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(prefix)
            .map(|names| names.iter().map(|n| StorageObject { name: Some(n.clone()) }).collect())
            .unwrap_or_default())
    }

    async fn remove(&self, _bucket: &str, paths: &[String]) -> Result<(), ClientError> {
        self.log.push(Call::RemoveStorage(paths.to_vec()));
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            if let Some((prefix, name)) = path.rsplit_once('/') {
                if let Some(names) = objects.get_mut(prefix) {
                    names.retain(|n| n != name);
                }
            }
        }
        Ok(())
    }
}

pub struct FakeIdentity {
    log: CallLog,
    users: Mutex<HashSet<Uuid>>,
    fail: bool,
}

impl FakeIdentity {
    pub fn new(log: CallLog, users: &[Uuid]) -> Self {
        Self { log, users: Mutex::new(users.iter().copied().collect()), fail: false }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, users: Mutex::new(HashSet::new()), fail: true }
    }

    pub fn has_user(&self, id: Uuid) -> bool {
        self.users.lock().unwrap().contains(&id)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn delete_user(&self, user_id: Uuid) -> Result<UserRemoval, ClientError> {
        self.log.push(Call::DeleteUser(user_id));
        if self.fail {
            return Err(injected());
        }
        if self.users.lock().unwrap().remove(&user_id) {
            Ok(UserRemoval::Removed)
        } else {
            Ok(UserRemoval::NotFound)
        }
    }
}

/// Records outgoing mail; fails for the listed recipients.
pub struct FakeMailer {
    log: CallLog,
    fail_for: HashSet<String>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl FakeMailer {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail_for: HashSet::new(), sent: Mutex::new(Vec::new()) }
    }

    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.fail_for.insert(recipient.to_string());
        self
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for FakeMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ClientError> {
        self.log.push(Call::SendEmail(email.to.clone()));
        if self.fail_for.contains(&email.to) {
            return Err(injected());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("msg_{}", sent.len()))
    }
}
