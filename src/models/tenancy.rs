// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
        }
    }
}

// A coluna `status` é TEXT com CHECK no banco.
impl TryFrom<String> for TenantStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            other => Err(format!("status de tenant desconhecido: {other}")),
        }
    }
}

// ---
// Tenant (a "Farmácia")
// ---
// Só as operações de ciclo de vida (suspender/reativar) alteram o status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: Uuid,
    pub subdomain: String,
    #[sqlx(try_from = "String")]
    pub status: TenantStatus,
    pub subscription_plan: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TenantRecord {
    pub fn is_suspended(&self) -> bool {
        self.status == TenantStatus::Suspended
    }
}

/// Tenant resolvido para a requisição corrente (vai nas extensions).
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: TenantRecord,
    // A suspensão não nega aqui; quem decide é o SubscriptionGate.
    pub tenant_suspended: bool,
}

impl TenantContext {
    pub fn new(tenant: TenantRecord) -> Self {
        let tenant_suspended = tenant.is_suspended();
        Self {
            tenant,
            tenant_suspended,
        }
    }

    pub fn id(&self) -> Uuid {
        self.tenant.id
    }
}

/// De onde veio o identificador do tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantHint {
    Id(Uuid),
    Subdomain(String),
}
