// src/models/rbac.rs

use axum::http::Method;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use validator::{Validate, ValidationError};

use crate::{common::error::AppError, models::auth::Role};

const KNOWN_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

fn validate_methods(methods: &BTreeSet<String>) -> Result<(), ValidationError> {
    if methods.is_empty() {
        return Err(ValidationError::new("empty_methods"));
    }
    if methods.iter().any(|m| !KNOWN_METHODS.contains(&m.as_str())) {
        return Err(ValidationError::new("unknown_method"));
    }
    Ok(())
}

// Uma regra da tabela estática: papel -> prefixo de rota -> métodos.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
    #[validate(length(min = 1, message = "O prefixo da rota é obrigatório."))]
    pub path_prefix: String,
    #[validate(custom(function = "validate_methods"))]
    pub allowed_methods: BTreeSet<String>,
}

impl PermissionRule {
    pub fn new(path_prefix: &str, methods: &[&str]) -> Self {
        Self {
            path_prefix: path_prefix.to_ascii_lowercase(),
            allowed_methods: methods.iter().map(|m| m.to_ascii_uppercase()).collect(),
        }
    }

    // startsWith sem diferenciar maiúsculas.
    pub fn matches(&self, path_lower: &str, method: &Method) -> bool {
        path_lower.starts_with(&self.path_prefix)
            && self.allowed_methods.contains(method.as_str())
    }
}

/// Tabela papel -> regras. Imutável depois de carregada; leitura concorrente.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    rules: HashMap<Role, Vec<PermissionRule>>,
}

impl PermissionTable {
    /// Normaliza e valida. Regras inválidas impedem a subida do serviço.
    pub fn new(rules: HashMap<Role, Vec<PermissionRule>>) -> Result<Self, AppError> {
        let mut normalized = HashMap::with_capacity(rules.len());
        for (role, role_rules) in rules {
            let mut checked = Vec::with_capacity(role_rules.len());
            for mut rule in role_rules {
                rule.path_prefix = rule.path_prefix.to_ascii_lowercase();
                rule.allowed_methods = rule
                    .allowed_methods
                    .iter()
                    .map(|m| m.to_ascii_uppercase())
                    .collect();
                rule.validate().map_err(|e| {
                    AppError::Configuration(format!("regra inválida para {role}: {e}"))
                })?;
                checked.push(rule);
            }
            normalized.insert(role, checked);
        }
        Ok(Self { rules: normalized })
    }

    /// Formato do arquivo: `{ "cashier": [{ "pathPrefix": "...", "allowedMethods": [...] }] }`
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let parsed: HashMap<String, Vec<PermissionRule>> = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("tabela de permissões: {e}")))?;
        let rules = parsed
            .into_iter()
            .map(|(role, rules)| (role.parse::<Role>().unwrap_or_else(|never| match never {}), rules))
            .collect();
        Self::new(rules)
    }

    pub fn rules_for(&self, role: &Role) -> &[PermissionRule] {
        self.rules.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Semântica OR: basta uma regra casar.
    pub fn permits(&self, role: &Role, path: &str, method: &Method) -> bool {
        let path_lower = path.to_ascii_lowercase();
        self.rules_for(role)
            .iter()
            .any(|rule| rule.matches(&path_lower, method))
    }

    /// Tabela embutida, usada quando PERMISSIONS_FILE não está definido.
    pub fn builtin() -> Self {
        const READ: &[&str] = &["GET"];
        const WRITE: &[&str] = &["GET", "POST", "PUT", "PATCH"];
        const ALL: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

        let mut rules = HashMap::new();
        rules.insert(
            Role::SuperAdmin,
            vec![
                PermissionRule::new("/api/v1/platform", ALL),
                PermissionRule::new("/api/v1/tenants", ALL),
                PermissionRule::new("/api/v1/session", READ),
                PermissionRule::new("/api/v1/subscriptions", ALL),
            ],
        );
        rules.insert(
            Role::Admin,
            vec![
                PermissionRule::new("/api/v1/patients", ALL),
                PermissionRule::new("/api/v1/inventory", ALL),
                PermissionRule::new("/api/v1/prescriptions", ALL),
                PermissionRule::new("/api/v1/sales", ALL),
                PermissionRule::new("/api/v1/payments", ALL),
                PermissionRule::new("/api/v1/branches", ALL),
                PermissionRule::new("/api/v1/branch", ALL),
                PermissionRule::new("/api/v1/users", ALL),
                PermissionRule::new("/api/v1/reports", READ),
                PermissionRule::new("/api/v1/subscriptions", ALL),
                PermissionRule::new("/api/v1/session", READ),
            ],
        );
        rules.insert(
            Role::BranchManager,
            vec![
                PermissionRule::new("/api/v1/patients", WRITE),
                PermissionRule::new("/api/v1/inventory", WRITE),
                PermissionRule::new("/api/v1/prescriptions", WRITE),
                PermissionRule::new("/api/v1/sales", WRITE),
                PermissionRule::new("/api/v1/payments", WRITE),
                PermissionRule::new("/api/v1/branches", WRITE),
                PermissionRule::new("/api/v1/branch", WRITE),
                PermissionRule::new("/api/v1/reports", READ),
                PermissionRule::new("/api/v1/session", READ),
            ],
        );
        rules.insert(
            Role::Pharmacist,
            vec![
                PermissionRule::new("/api/v1/patients", WRITE),
                PermissionRule::new("/api/v1/prescriptions", WRITE),
                PermissionRule::new("/api/v1/inventory", READ),
                PermissionRule::new("/api/v1/branches", READ),
                PermissionRule::new("/api/v1/branch", READ),
                PermissionRule::new("/api/v1/session", READ),
            ],
        );
        rules.insert(
            Role::Cashier,
            vec![
                PermissionRule::new("/api/v1/sales", &["GET", "POST"]),
                PermissionRule::new("/api/v1/payments", &["GET", "POST"]),
                PermissionRule::new("/api/v1/branches", READ),
                PermissionRule::new("/api/v1/branch", READ),
                PermissionRule::new("/api/v1/session", READ),
            ],
        );

        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cashier_table() -> PermissionTable {
        let mut rules = HashMap::new();
        rules.insert(
            Role::Cashier,
            vec![
                PermissionRule::new("/api/v1/sales", &["GET", "POST"]),
                PermissionRule::new("/api/v1/payments", &["GET", "POST"]),
            ],
        );
        PermissionTable::new(rules).unwrap()
    }

    #[test]
    fn any_matching_rule_grants() {
        let table = cashier_table();
        assert!(!table.permits(&Role::Cashier, "/api/v1/sales", &Method::DELETE));
        assert!(table.permits(&Role::Cashier, "/api/v1/payments", &Method::GET));
        assert!(table.permits(&Role::Cashier, "/API/V1/Sales/123", &Method::POST));
        assert!(!table.permits(&Role::Pharmacist, "/api/v1/sales", &Method::GET));
    }

    #[test]
    fn json_table_is_validated() {
        let ok = PermissionTable::from_json(
            r#"{ "Cashier": [{ "pathPrefix": "/API/v1/sales", "allowedMethods": ["get"] }] }"#,
        )
        .unwrap();
        assert!(ok.permits(&Role::Cashier, "/api/v1/sales", &Method::GET));

        let empty_methods = PermissionTable::from_json(
            r#"{ "cashier": [{ "pathPrefix": "/api/v1/sales", "allowedMethods": [] }] }"#,
        );
        assert!(matches!(empty_methods, Err(AppError::Configuration(_))));

        let bad_prefix = PermissionTable::from_json(
            r#"{ "cashier": [{ "pathPrefix": "", "allowedMethods": ["GET"] }] }"#,
        );
        assert!(bad_prefix.is_err());
    }

    #[test]
    fn example_permissions_file_loads() {
        let table =
            PermissionTable::from_json(include_str!("../../config/permissions.example.json")).unwrap();
        assert!(table.permits(&Role::SuperAdmin, "/api/v1/platform/tenants/x/suspend", &Method::POST));
        assert!(!table.permits(&Role::Cashier, "/api/v1/sales", &Method::DELETE));
    }

    #[test]
    fn builtin_roles_reach_both_branch_route_forms() {
        let table = PermissionTable::builtin();
        for role in [Role::Admin, Role::BranchManager, Role::Pharmacist, Role::Cashier] {
            assert!(table.permits(&role, "/api/v1/branches/B1/stock", &Method::GET), "{role}");
            assert!(table.permits(&role, "/api/v1/branch/B1", &Method::GET), "{role}");
        }
    }
}
