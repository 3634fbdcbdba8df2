// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    models::tenancy::TenantContext,
    services::tenant_resolver::Resolution,
};

// Resolve o tenant e deixa o contexto nas extensions para as próximas etapas.
pub async fn tenant_resolver(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match app_state.resolver.resolve(&path, request.headers()).await {
        Ok(Resolution::Resolved(ctx)) => {
            tracing::debug!(tenant_id = %ctx.id(), suspended = ctx.tenant_suspended, "Tenant resolvido");
            request.extensions_mut().insert(ctx);
        }
        Ok(Resolution::Bypassed) | Ok(Resolution::Anonymous) => {}
        Err(e) => {
            tracing::warn!(path = %path, "Tenant não resolvido: {}", e);
            return e.into_response();
        }
    }

    next.run(request).await
}

// Extrator para os handlers que exigem tenant.
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Tenant identifier is required"))
    }
}
