// src/services/authorization.rs

use axum::http::StatusCode;
use std::{fmt, sync::Arc};

use crate::{
    common::{
        error::AppError,
        routes::{extract_branch_ids, is_authorization_exempt, RouteTarget},
    },
    db::branch_repo::BranchStore,
    models::{
        auth::{Role, UserPrincipal},
        rbac::PermissionTable,
        session::DbSessionContext,
        tenancy::TenantContext,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AuthenticationRequired,
    TenantMismatch,
    RoleNotPermitted,
    BranchNotPermitted,
}

impl DenyReason {
    pub fn status(&self) -> StatusCode {
        match self {
            DenyReason::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            _ => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::AuthenticationRequired => "authentication_required",
            DenyReason::TenantMismatch => "tenant_mismatch",
            DenyReason::RoleNotPermitted => "role_not_permitted",
            DenyReason::BranchNotPermitted => "branch_not_permitted",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            DenyReason::AuthenticationRequired => "Authentication required",
            DenyReason::TenantMismatch => "Access denied: tenant mismatch",
            DenyReason::RoleNotPermitted => "Access denied: insufficient role permissions",
            DenyReason::BranchNotPermitted => "Access denied: branch not accessible",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub status: StatusCode,
}

impl From<DenyReason> for Denial {
    fn from(reason: DenyReason) -> Self {
        Self {
            status: reason.status(),
            reason,
        }
    }
}

impl From<&Denial> for AppError {
    fn from(denial: &Denial) -> Self {
        match denial.reason {
            DenyReason::AuthenticationRequired => AppError::Unauthenticated,
            reason => AppError::Forbidden(reason.to_string()),
        }
    }
}

/// Decisão explícita de cada etapa; nada de exceção para controle de fluxo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    fn deny(reason: DenyReason) -> Self {
        Decision::Deny(reason.into())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Clone)]
pub struct AuthorizationDecisionEngine {
    permissions: Arc<PermissionTable>,
    branches: Arc<dyn BranchStore>,
}

impl AuthorizationDecisionEngine {
    pub fn new(permissions: Arc<PermissionTable>, branches: Arc<dyn BranchStore>) -> Self {
        Self {
            permissions,
            branches,
        }
    }

    /// Checagens em ordem, parando na primeira negação:
    /// autenticação, tenant da claim, tabela de papéis e hierarquia de filiais.
    pub async fn authorize(
        &self,
        principal: Option<&UserPrincipal>,
        tenant: Option<&TenantContext>,
        route: &RouteTarget,
    ) -> Result<Decision, AppError> {
        if is_authorization_exempt(&route.path) {
            return Ok(Decision::Allow);
        }

        let Some(principal) = principal else {
            return Ok(Decision::deny(DenyReason::AuthenticationRequired));
        };

        // O bypass do SuperAdmin vale só para esta checagem.
        if let Some(tenant) = tenant {
            if !principal.role.is_super_admin() && principal.tenant_id != Some(tenant.id()) {
                return Ok(Decision::deny(DenyReason::TenantMismatch));
            }
        }

        if !self
            .permissions
            .permits(&principal.role, &route.path, &route.method)
        {
            return Ok(Decision::deny(DenyReason::RoleNotPermitted));
        }

        self.check_branch(principal, tenant, route).await
    }

    async fn check_branch(
        &self,
        principal: &UserPrincipal,
        tenant: Option<&TenantContext>,
        route: &RouteTarget,
    ) -> Result<Decision, AppError> {
        if principal.role.is_super_admin() {
            return Ok(Decision::Allow);
        }
        let Some(access) = &principal.branch_access else {
            return Ok(Decision::Allow);
        };

        // Toda filial citada na rota precisa passar, não só a primeira.
        let pending: Vec<&str> = extract_branch_ids(&route.path)
            .into_iter()
            .filter(|id| !access.permits(id) && principal.own_branch_id.as_deref() != Some(*id))
            .collect();
        if pending.is_empty() {
            return Ok(Decision::Allow);
        }

        // Gerente de filial também acessa as filiais filhas diretas (uma aresta).
        if principal.role == Role::BranchManager {
            if let (Some(own), Some(tenant_id)) = (
                principal.own_branch_id.as_deref(),
                tenant.map(|t| t.id()).or(principal.tenant_id),
            ) {
                // A árvore é lida sob o contexto RLS do próprio tenant.
                let scope = DbSessionContext {
                    tenant_id,
                    user_id: principal.user_id,
                    role: principal.role.as_str().to_string(),
                    branch_id: Some(own.to_string()),
                };
                let tree = self.branches.load_tree(&scope).await?;
                if pending.iter().all(|id| tree.is_direct_child(own, id)) {
                    return Ok(Decision::Allow);
                }
            }
        }

        Ok(Decision::deny(DenyReason::BranchNotPermitted))
    }
}
