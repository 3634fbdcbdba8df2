// src/models/auth.rs

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

pub const ALL_BRANCHES: &str = "all";

// Papéis conhecidos. Papéis customizados passam como `Custom` e só
// ganham acesso se a tabela de permissões tiver regras para eles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    SuperAdmin,
    Admin,
    BranchManager,
    Pharmacist,
    Cashier,
    Custom(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::BranchManager => "branch_manager",
            Role::Pharmacist => "pharmacist",
            Role::Cashier => "cashier",
            Role::Custom(name) => name,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    // Aceita "SuperAdmin", "super_admin" e "super-admin".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        Ok(match normalized.as_str() {
            "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "branchmanager" => Role::BranchManager,
            "pharmacist" => Role::Pharmacist,
            "cashier" => Role::Cashier,
            _ => Role::Custom(s.trim().to_string()),
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|never| match never {}))
    }
}

/// Restrição de filiais vinda das claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchAccess {
    All,
    Only(BTreeSet<String>),
}

impl BranchAccess {
    pub fn from_claim(entries: &[String]) -> Self {
        if entries.iter().any(|e| e.eq_ignore_ascii_case(ALL_BRANCHES)) {
            BranchAccess::All
        } else {
            BranchAccess::Only(entries.iter().cloned().collect())
        }
    }

    pub fn permits(&self, branch_id: &str) -> bool {
        match self {
            BranchAccess::All => true,
            BranchAccess::Only(ids) => ids.contains(branch_id),
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT. Só decodificamos; a emissão é de outro serviço.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: String,
    #[serde(default)]
    pub branch_id: Option<String>,
    // Ausente = sem restrição de filial.
    #[serde(default)]
    pub branch_access: Option<Vec<String>>,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// Usuário autenticado, derivado das claims. Nunca persistido aqui.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub own_branch_id: Option<String>,
    pub branch_access: Option<BranchAccess>,
}

impl From<Claims> for UserPrincipal {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role.parse().unwrap_or_else(|never| match never {}),
            own_branch_id: claims.branch_id,
            branch_access: claims.branch_access.as_deref().map(BranchAccess::from_claim),
        }
    }
}

// Resposta de GET /api/v1/auth/me
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    #[schema(value_type = String, example = "pharmacist")]
    pub role: Role,
    pub branch_id: Option<String>,
    pub branch_access: Option<Vec<String>>,
}

impl From<&UserPrincipal> for PrincipalResponse {
    fn from(p: &UserPrincipal) -> Self {
        Self {
            user_id: p.user_id,
            tenant_id: p.tenant_id,
            role: p.role.clone(),
            branch_id: p.own_branch_id.clone(),
            branch_access: p.branch_access.as_ref().map(|access| match access {
                BranchAccess::All => vec![ALL_BRANCHES.to_string()],
                BranchAccess::Only(ids) => ids.iter().cloned().collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_common_spellings() {
        assert_eq!("SuperAdmin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!("branch-manager".parse::<Role>().unwrap(), Role::BranchManager);
        assert_eq!("Cashier".parse::<Role>().unwrap(), Role::Cashier);
        assert_eq!(
            "auditor".parse::<Role>().unwrap(),
            Role::Custom("auditor".to_string())
        );
    }

    #[test]
    fn all_sentinel_wins_over_explicit_ids() {
        let access = BranchAccess::from_claim(&["B1".into(), "ALL".into()]);
        assert_eq!(access, BranchAccess::All);
        assert!(access.permits("B99"));

        let access = BranchAccess::from_claim(&["B1".into(), "B3".into()]);
        assert!(access.permits("B3"));
        assert!(!access.permits("B2"));
    }
}
