// src/testing.rs
//
// Implementações em memória dos colaboradores, só para testes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        branch_repo::BranchStore,
        security_repo::{IpBlockList, SecurityEventSink},
        session::{SessionConnection, SessionPool, TxControl},
        tenancy_repo::{SubscriptionStore, TenantStore},
    },
    models::{
        branch::{BranchNode, BranchTree},
        security::{IpBlockEntry, SecurityEvent},
        session::DbSessionContext,
        subscription::SubscriptionRecord,
        tenancy::{TenantRecord, TenantStatus},
    },
};

// ---
// Pool de sessões falsa
// ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOp {
    Bind(Uuid),
    Clear,
    Begin,
    Commit,
    Rollback,
}

#[derive(Default)]
struct FakeSession {
    context: Option<DbSessionContext>,
    ops: Vec<SessionOp>,
    observed_before_bind: Vec<Option<Uuid>>,
}

#[derive(Default)]
struct FakePoolState {
    sessions: Vec<Arc<Mutex<FakeSession>>>,
    idle: Vec<usize>,
    discarded: usize,
    fail_next_bind: bool,
    fail_next_clear: bool,
}

#[derive(Clone, Default)]
pub struct FakeSessionPool {
    state: Arc<Mutex<FakePoolState>>,
}

impl FakeSessionPool {
    pub fn with_connections(n: usize) -> Self {
        let pool = Self::default();
        {
            let mut state = pool.state.lock().unwrap();
            for i in 0..n {
                state.sessions.push(Arc::new(Mutex::new(FakeSession::default())));
                state.idle.push(i);
            }
        }
        pool
    }

    pub fn fail_next_bind(&self) {
        self.state.lock().unwrap().fail_next_bind = true;
    }

    pub fn fail_next_clear(&self) {
        self.state.lock().unwrap().fail_next_clear = true;
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().unwrap().idle.len()
    }

    pub fn discarded_count(&self) -> usize {
        self.state.lock().unwrap().discarded
    }

    fn session(&self, index: usize) -> Arc<Mutex<FakeSession>> {
        self.state.lock().unwrap().sessions[index].clone()
    }

    pub fn current_context(&self, index: usize) -> Option<DbSessionContext> {
        self.session(index).lock().unwrap().context.clone()
    }

    pub fn ops(&self, index: usize) -> Vec<SessionOp> {
        self.session(index).lock().unwrap().ops.clone()
    }

    pub fn observed_before_bind(&self, index: usize) -> Vec<Option<Uuid>> {
        self.session(index).lock().unwrap().observed_before_bind.clone()
    }

    pub fn bound_tenants(&self, index: usize) -> Vec<Uuid> {
        self.ops(index)
            .into_iter()
            .filter_map(|op| match op {
                SessionOp::Bind(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeConnection {
    index: usize,
    pool: FakeSessionPool,
    discarded: bool,
}

impl FakeConnection {
    fn session(&self) -> Arc<Mutex<FakeSession>> {
        self.pool.session(self.index)
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if !self.discarded {
            self.pool.state.lock().unwrap().idle.push(self.index);
        }
    }
}

#[async_trait]
impl SessionConnection for FakeConnection {
    async fn set_context(&mut self, ctx: &DbSessionContext) -> Result<(), AppError> {
        let fail = std::mem::take(&mut self.pool.state.lock().unwrap().fail_next_bind);
        let session = self.session();
        let mut session = session.lock().unwrap();
        let before = session.context.as_ref().map(|c| c.tenant_id);
        session.observed_before_bind.push(before);
        // Simula um set parcial antes da falha.
        session.context = Some(ctx.clone());
        if fail {
            return Err(AppError::InternalServerError(anyhow::anyhow!("set_config falhou")));
        }
        session.ops.push(SessionOp::Bind(ctx.tenant_id));
        Ok(())
    }

    async fn clear_context(&mut self) -> Result<(), AppError> {
        let fail = std::mem::take(&mut self.pool.state.lock().unwrap().fail_next_clear);
        if fail {
            return Err(AppError::InternalServerError(anyhow::anyhow!("conexão perdida")));
        }
        let session = self.session();
        let mut session = session.lock().unwrap();
        session.context = None;
        session.ops.push(SessionOp::Clear);
        Ok(())
    }

    async fn current_context(&mut self) -> Result<Option<DbSessionContext>, AppError> {
        Ok(self.session().lock().unwrap().context.clone())
    }

    async fn control(&mut self, control: TxControl) -> Result<(), AppError> {
        let op = match control {
            TxControl::Begin => SessionOp::Begin,
            TxControl::Commit => SessionOp::Commit,
            TxControl::Rollback => SessionOp::Rollback,
        };
        self.session().lock().unwrap().ops.push(op);
        Ok(())
    }

    fn discard(mut self) {
        self.discarded = true;
        self.pool.state.lock().unwrap().discarded += 1;
    }
}

#[async_trait]
impl SessionPool for FakeSessionPool {
    type Conn = FakeConnection;

    async fn checkout(&self) -> Result<FakeConnection, AppError> {
        let index = self
            .state
            .lock()
            .unwrap()
            .idle
            .pop()
            .ok_or_else(|| AppError::Downstream("pool esgotada".into()))?;
        Ok(FakeConnection {
            index,
            pool: self.clone(),
            discarded: false,
        })
    }
}

// ---
// Tenants, assinaturas e filiais
// ---

pub fn tenant(subdomain: &str, status: TenantStatus, created_at: DateTime<Utc>) -> TenantRecord {
    TenantRecord {
        id: Uuid::new_v4(),
        subdomain: subdomain.to_string(),
        status,
        subscription_plan: None,
        created_at,
    }
}

#[derive(Clone, Default)]
pub struct FakeTenantStore {
    tenants: Arc<Mutex<Vec<TenantRecord>>>,
    subscriptions: Arc<Mutex<Vec<SubscriptionRecord>>>,
    fail_subscriptions: Arc<Mutex<bool>>,
    fail_tenants: Arc<Mutex<bool>>,
}

impl FakeTenantStore {
    pub fn add_tenant(&self, tenant: TenantRecord) {
        self.tenants.lock().unwrap().push(tenant);
    }

    pub fn add_subscription(&self, subscription: SubscriptionRecord) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    pub fn fail_subscription_lookups(&self) {
        *self.fail_subscriptions.lock().unwrap() = true;
    }

    pub fn fail_tenant_lookups(&self) {
        *self.fail_tenants.lock().unwrap() = true;
    }

    fn tenant_lookup(&self) -> Result<(), AppError> {
        if *self.fail_tenants.lock().unwrap() {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn status_of(&self, id: Uuid) -> Option<TenantStatus> {
        self.tenants.lock().unwrap().iter().find(|t| t.id == id).map(|t| t.status)
    }
}

#[async_trait]
impl TenantStore for FakeTenantStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TenantRecord>, AppError> {
        self.tenant_lookup()?;
        Ok(self.tenants.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantRecord>, AppError> {
        self.tenant_lookup()?;
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.subdomain.eq_ignore_ascii_case(subdomain))
            .cloned())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<TenantRecord>, AppError> {
        let mut tenants = self.tenants.lock().unwrap();
        Ok(tenants.iter_mut().find(|t| t.id == id).map(|t| {
            t.status = status;
            t.clone()
        }))
    }
}

#[async_trait]
impl SubscriptionStore for FakeTenantStore {
    async fn subscriptions_for(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, AppError> {
        if *self.fail_subscriptions.lock().unwrap() {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

// Todas as filiais de todos os tenants juntas, como na tabela; `load_tree`
// filtra pelo tenant do contexto vinculado, igual à policy RLS.
#[derive(Clone, Default)]
pub struct FakeBranchStore {
    rows: Arc<Mutex<Vec<BranchNode>>>,
    scopes: Arc<Mutex<Vec<DbSessionContext>>>,
}

impl FakeBranchStore {
    pub fn add(&self, tenant_id: Uuid, id: &str, parent: Option<&str>) {
        self.rows.lock().unwrap().push(BranchNode {
            id: id.to_string(),
            tenant_id,
            parent_branch_id: parent.map(str::to_string),
        });
    }

    pub fn scopes(&self) -> Vec<DbSessionContext> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BranchStore for FakeBranchStore {
    async fn load_tree(&self, scope: &DbSessionContext) -> Result<BranchTree, AppError> {
        self.scopes.lock().unwrap().push(scope.clone());
        let visible = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.tenant_id == scope.tenant_id)
            .cloned()
            .collect();
        BranchTree::build(scope.tenant_id, visible)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!(e.to_string())))
    }
}

// ---
// Segurança
// ---

#[derive(Clone, Default)]
pub struct FakeIpBlockList {
    blocked: Arc<Mutex<Vec<IpBlockEntry>>>,
}

impl FakeIpBlockList {
    pub fn block(&self, ip: &str, reason: &str) {
        self.blocked.lock().unwrap().push(IpBlockEntry {
            ip_address: ip.to_string(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
    }
}

#[async_trait]
impl IpBlockList for FakeIpBlockList {
    async fn find_block(&self, ip_address: &str) -> Result<Option<IpBlockEntry>, AppError> {
        Ok(self
            .blocked
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.ip_address == ip_address)
            .cloned())
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecurityEventSink for RecordingSink {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AppError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
