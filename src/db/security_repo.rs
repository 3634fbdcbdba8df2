// src/db/security_repo.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::security::{IpBlockEntry, SecurityEvent},
};

/// Lista de IPs bloqueados. Escrita fora deste pipeline.
#[async_trait]
pub trait IpBlockList: Send + Sync {
    async fn find_block(&self, ip_address: &str) -> Result<Option<IpBlockEntry>, AppError>;
}

/// Destino dos eventos de auditoria (append-only).
#[async_trait]
pub trait SecurityEventSink: Send + Sync {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SecurityRepository {
    pool: PgPool,
}

impl SecurityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IpBlockList for SecurityRepository {
    async fn find_block(&self, ip_address: &str) -> Result<Option<IpBlockEntry>, AppError> {
        let entry = sqlx::query_as::<_, IpBlockEntry>(
            "SELECT ip_address, reason, created_at FROM ip_blocklist WHERE ip_address = $1",
        )
        .bind(ip_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}

#[async_trait]
impl SecurityEventSink for SecurityRepository {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO security_events
                (event_type, description, ip_address, user_id, user_agent,
                 request_path, risk_level, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb, $9)
            "#,
        )
        .bind(event.event_type.as_str())
        .bind(&event.description)
        .bind(&event.ip_address)
        .bind(event.user_id)
        .bind(event.user_agent.as_deref())
        .bind(&event.request_path)
        .bind(event.risk_level.as_str())
        .bind(Value::Object(event.metadata.clone()).to_string())
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
