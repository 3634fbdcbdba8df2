// src/models/session.rs

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{auth::UserPrincipal, tenancy::TenantContext};

/// Contexto vinculado a UMA conexão durante uma unidade de trabalho.
/// Efêmero: nunca persistido, sempre limpo antes da conexão voltar à pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DbSessionContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub branch_id: Option<String>,
}

impl DbSessionContext {
    pub fn for_request(tenant: &TenantContext, principal: &UserPrincipal) -> Self {
        Self {
            tenant_id: tenant.id(),
            user_id: principal.user_id,
            role: principal.role.to_string(),
            branch_id: principal.own_branch_id.clone(),
        }
    }
}

/// Como a unidade de trabalho é delimitada na conexão.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWork {
    Session,
    Transaction,
}
