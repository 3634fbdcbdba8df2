// src/services/tenant_resolver.rs

use axum::http::{header, HeaderMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        routes::{classify, RouteClass},
    },
    db::tenancy_repo::TenantStore,
    models::tenancy::{TenantContext, TenantHint},
    services::auth::ClaimsDecoder,
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Resultado da resolução: isento, sem tenant (tolerado) ou resolvido.
#[derive(Debug, Clone)]
pub enum Resolution {
    Bypassed,
    Anonymous,
    Resolved(TenantContext),
}

#[derive(Clone)]
pub struct TenantContextResolver {
    tenants: Arc<dyn TenantStore>,
    claims: ClaimsDecoder,
    base_domain: Option<String>,
}

impl TenantContextResolver {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        claims: ClaimsDecoder,
        base_domain: Option<String>,
    ) -> Self {
        Self {
            tenants,
            claims,
            base_domain: base_domain.map(|d| d.trim_start_matches('.').to_ascii_lowercase()),
        }
    }

    /// Header X-Tenant-ID, depois subdomínio do Host, depois a claim do token.
    pub fn extract_hint(&self, headers: &HeaderMap) -> Result<Option<TenantHint>, AppError> {
        if let Some(value) = headers.get(TENANT_ID_HEADER) {
            let raw = value
                .to_str()
                .map_err(|_| AppError::TenantNotFound)?
                .trim();
            if !raw.is_empty() {
                return Ok(Some(match Uuid::parse_str(raw) {
                    Ok(id) => TenantHint::Id(id),
                    Err(_) => TenantHint::Subdomain(raw.to_ascii_lowercase()),
                }));
            }
        }

        if let Some(subdomain) = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|host| self.subdomain_of(host))
        {
            return Ok(Some(TenantHint::Subdomain(subdomain)));
        }

        // Token inválido aqui é só "sem dica"; quem responde 401 é a autenticação.
        let token = ClaimsDecoder::bearer(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
        );
        Ok(token
            .and_then(|t| self.claims.decode(t).ok())
            .and_then(|principal| principal.tenant_id)
            .map(TenantHint::Id))
    }

    fn subdomain_of(&self, host: &str) -> Option<String> {
        let base = self.base_domain.as_deref()?;
        let host = host.split(':').next()?.to_ascii_lowercase();
        let label = host.strip_suffix(base)?.strip_suffix('.')?;
        // Só um rótulo: "farmacia.app.com", nunca "a.b.app.com" ou "www".
        if label.is_empty() || label.contains('.') || label == "www" {
            return None;
        }
        Some(label.to_string())
    }

    pub async fn resolve(&self, path: &str, headers: &HeaderMap) -> Result<Resolution, AppError> {
        let class = classify(path);
        if class == RouteClass::Exempt {
            return Ok(Resolution::Bypassed);
        }

        let tenant = match self.extract_hint(headers) {
            Ok(Some(TenantHint::Id(id))) => self.tenants.find_by_id(id).await?,
            Ok(Some(TenantHint::Subdomain(sub))) => self.tenants.find_by_subdomain(&sub).await?,
            Ok(None) => {
                return match class {
                    RouteClass::TenantRequired => Err(AppError::MissingTenant),
                    _ => Ok(Resolution::Anonymous),
                };
            }
            Err(e) if class == RouteClass::TenantRequired => return Err(e),
            Err(_) => None,
        };

        match (tenant, class) {
            // Suspensão não nega aqui: o SubscriptionGate dá a mensagem certa.
            (Some(tenant), _) => Ok(Resolution::Resolved(TenantContext::new(tenant))),
            (None, RouteClass::TenantRequired) => Err(AppError::TenantNotFound),
            (None, _) => Ok(Resolution::Anonymous),
        }
    }
}
