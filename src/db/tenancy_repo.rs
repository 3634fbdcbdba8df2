// src/db/tenancy_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        subscription::SubscriptionRecord,
        tenancy::{TenantRecord, TenantStatus},
    },
};

/// Leitura de tenants (feita em toda requisição) e ciclo de vida.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TenantRecord>, AppError>;
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantRecord>, AppError>;
    async fn set_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<TenantRecord>, AppError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn subscriptions_for(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, AppError>;
}

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TenantRecord>, AppError> {
        let tenant = sqlx::query_as::<_, TenantRecord>(
            "SELECT id, subdomain, status, subscription_plan, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantRecord>, AppError> {
        // O subdomínio é único e guardado em minúsculas.
        let tenant = sqlx::query_as::<_, TenantRecord>(
            r#"
            SELECT id, subdomain, status, subscription_plan, created_at
            FROM tenants
            WHERE subdomain = lower($1)
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<TenantRecord>, AppError> {
        let tenant = sqlx::query_as::<_, TenantRecord>(
            r#"
            UPDATE tenants SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, subdomain, status, subscription_plan, created_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }
}

#[async_trait]
impl SubscriptionStore for TenantRepository {
    async fn subscriptions_for(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, AppError> {
        let subscriptions = sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT tenant_id, plan_type, start_date, end_date
            FROM subscriptions
            WHERE tenant_id = $1
            ORDER BY start_date DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }
}
