// src/common/routes.rs

use axum::http::Method;

// Rotas que pulam a resolução de tenant por completo.
// Esta lista faz parte do contrato: não altere sem migrar os clientes.
// Cada entrada casa o caminho exato ou seus subcaminhos (`{p}/...`), nunca `{p}xyz`.
const TENANT_EXEMPT: &[&str] = &[
    "/health",
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh",
    "/api/v1/auth/forgot-password",
    "/api/v1/auth/reset-password",
    "/swagger-ui",
    "/api-docs",
];

// Rotas em que o tenant é resolvido se vier, mas não é obrigatório.
const TENANT_OPTIONAL: &[&str] = &[
    "/api/v1/auth/me",
    "/api/v1/platform",
    "/suspended",
    "/subscription",
];

// Rotas liberadas da checagem de autenticação/autorização.
const AUTHZ_EXEMPT: &[&str] = &[
    "/health",
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/refresh",
    "/api/v1/auth/me",
    "/swagger-ui",
    "/api-docs",
    "/suspended",
    "/subscription",
];

// Rotas que continuam acessíveis sem assinatura ativa.
const SUBSCRIPTION_EXEMPT: &[&str] = &[
    "/api/v1/subscriptions",
    "/api/v1/auth/me",
    "/api/v1/platform",
    "/subscription",
    "/suspended",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Exempt,
    TenantOptional,
    TenantRequired,
}

/// Destino de uma requisição, como o motor de autorização o enxerga.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    pub path: String,
    pub method: Method,
}

impl RouteTarget {
    pub fn new(path: impl Into<String>, method: Method) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }
}

// Respeita a fronteira de segmento: "/api-docs" não casa "/api-docsx".
fn under(path: &str, base: &str) -> bool {
    path.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn matches_any(path: &str, bases: &[&str]) -> bool {
    bases.iter().any(|base| under(path, base))
}

pub fn is_tenant_exempt(path: &str) -> bool {
    matches_any(path, TENANT_EXEMPT)
}

pub fn classify(path: &str) -> RouteClass {
    if is_tenant_exempt(path) {
        RouteClass::Exempt
    } else if matches_any(path, TENANT_OPTIONAL) {
        RouteClass::TenantOptional
    } else {
        RouteClass::TenantRequired
    }
}

pub fn is_authorization_exempt(path: &str) -> bool {
    matches_any(path, AUTHZ_EXEMPT)
}

pub fn is_subscription_exempt(path: &str) -> bool {
    is_tenant_exempt(path) || matches_any(path, SUBSCRIPTION_EXEMPT)
}

/// Chamadas de API recebem JSON; o resto é navegador e recebe redirect.
pub fn is_api_path(path: &str) -> bool {
    path.starts_with("/api/")
}

/// Ids de filial de todos os segmentos `/branch/{id}` ou `/branches/{id}/...` da rota.
pub fn extract_branch_ids(path: &str) -> Vec<&str> {
    let mut ids = Vec::new();
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("branch") || segment.eq_ignore_ascii_case("branches") {
            if let Some(id) = segments.next() {
                ids.push(id);
            }
        }
    }
    ids
}
