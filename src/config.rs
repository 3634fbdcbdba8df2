// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    db::{
        branch_repo::{BranchRepository, BranchStore},
        security_repo::{IpBlockList, SecurityEventSink, SecurityRepository},
        session::SessionBinder,
        tenancy_repo::{SubscriptionStore, TenantRepository, TenantStore},
    },
    models::rbac::PermissionTable,
    services::{
        auth::ClaimsDecoder,
        authorization::AuthorizationDecisionEngine,
        security_sentinel::{AuditDispatcher, SecuritySentinel, DEFAULT_AUDIT_CAPACITY},
        subscription_gate::SubscriptionGate,
        tenant_resolver::TenantContextResolver,
    },
};

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub base_domain: Option<String>,
    pub slow_request_threshold: Duration,
    pub trial_days: i64,
    pub audit_queue_capacity: usize,
    // true = comportamento histórico (fail-open). Ver DESIGN.md antes de mudar.
    pub subscription_fail_open: bool,
    pub permissions_file: Option<String>,
}

const MAX_TRIAL_DAYS: i64 = 3650;

fn in_range<T>(name: &str, value: T, range: std::ops::RangeInclusive<T>) -> anyhow::Result<T>
where
    T: PartialOrd + std::fmt::Display,
{
    if !range.contains(&value) {
        anyhow::bail!(
            "{name} fora do intervalo permitido ({}..={}): {value}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}

fn optional<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} tem um valor inválido: {raw}")),
        _ => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(optional("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            base_domain: env::var("BASE_DOMAIN").ok().filter(|d| !d.trim().is_empty()),
            slow_request_threshold: Duration::from_millis(optional(
                "SLOW_REQUEST_THRESHOLD_MS",
                5000,
            )?),
            trial_days: in_range("TRIAL_DAYS", optional("TRIAL_DAYS", 14)?, 0..=MAX_TRIAL_DAYS)?,
            audit_queue_capacity: in_range(
                "AUDIT_QUEUE_CAPACITY",
                optional("AUDIT_QUEUE_CAPACITY", DEFAULT_AUDIT_CAPACITY)?,
                1..=1_000_000,
            )?,
            subscription_fail_open: optional("SUBSCRIPTION_FAIL_OPEN", true)?,
            permissions_file: env::var("PERMISSIONS_FILE").ok().filter(|p| !p.trim().is_empty()),
        })
    }

    pub fn load_permissions(&self) -> anyhow::Result<PermissionTable> {
        match &self.permissions_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("não foi possível ler {path}"))?;
                Ok(PermissionTable::from_json(&raw)?)
            }
            None => Ok(PermissionTable::builtin()),
        }
    }
}

/// Colaboradores externos do pipeline (banco em produção, fakes nos testes).
pub struct Collaborators {
    pub tenants: Arc<dyn TenantStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub branches: Arc<dyn BranchStore>,
    pub ip_blocks: Arc<dyn IpBlockList>,
    pub events: Arc<dyn SecurityEventSink>,
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db_pool: PgPool,
    pub tenants: Arc<dyn TenantStore>,
    pub claims: ClaimsDecoder,
    pub sentinel: SecuritySentinel,
    pub audit: AuditDispatcher,
    pub resolver: TenantContextResolver,
    pub subscription_gate: SubscriptionGate,
    pub authorizer: AuthorizationDecisionEngine,
    pub binder: SessionBinder<PgPool>,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(settings.db_acquire_timeout)
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let permissions = settings.load_permissions()?;

        // --- Monta o gráfico de dependências ---
        let tenant_repo = Arc::new(TenantRepository::new(db_pool.clone()));
        let security_repo = Arc::new(SecurityRepository::new(db_pool.clone()));
        let collaborators = Collaborators {
            tenants: tenant_repo.clone(),
            subscriptions: tenant_repo,
            branches: Arc::new(BranchRepository::new(db_pool.clone())),
            ip_blocks: security_repo.clone(),
            events: security_repo,
        };

        Ok(Self::assemble(settings, db_pool, permissions, collaborators))
    }

    pub fn assemble(
        settings: Settings,
        db_pool: PgPool,
        permissions: PermissionTable,
        collaborators: Collaborators,
    ) -> Self {
        let claims = ClaimsDecoder::new(&settings.jwt_secret);
        let resolver = TenantContextResolver::new(
            collaborators.tenants.clone(),
            claims.clone(),
            settings.base_domain.clone(),
        );
        let subscription_gate = SubscriptionGate::new(
            collaborators.subscriptions,
            settings.trial_days,
            settings.subscription_fail_open,
        );
        let authorizer =
            AuthorizationDecisionEngine::new(Arc::new(permissions), collaborators.branches);

        let audit = AuditDispatcher::spawn(collaborators.events, settings.audit_queue_capacity);

        Self {
            settings: Arc::new(settings),
            binder: SessionBinder::new(db_pool.clone()),
            db_pool,
            tenants: collaborators.tenants,
            claims,
            sentinel: SecuritySentinel::new(collaborators.ip_blocks),
            audit,
            resolver,
            subscription_gate,
            authorizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_days_outside_the_range_are_rejected() {
        assert_eq!(in_range("TRIAL_DAYS", 14, 0..=MAX_TRIAL_DAYS).unwrap(), 14);
        assert_eq!(in_range("TRIAL_DAYS", 0, 0..=MAX_TRIAL_DAYS).unwrap(), 0);

        let err = in_range("TRIAL_DAYS", i64::MAX, 0..=MAX_TRIAL_DAYS).unwrap_err();
        assert!(err.to_string().contains("TRIAL_DAYS"));
        assert!(in_range("TRIAL_DAYS", -1, 0..=MAX_TRIAL_DAYS).is_err());
    }

    #[test]
    fn empty_audit_queue_is_rejected() {
        assert!(in_range("AUDIT_QUEUE_CAPACITY", 0_usize, 1..=1_000_000).is_err());
        assert_eq!(
            in_range("AUDIT_QUEUE_CAPACITY", DEFAULT_AUDIT_CAPACITY, 1..=1_000_000).unwrap(),
            DEFAULT_AUDIT_CAPACITY
        );
    }
}
