// src/middleware/subscription.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    common::{
        error::AppError,
        routes::{is_api_path, is_subscription_exempt},
    },
    config::AppState,
    models::tenancy::TenantContext,
};

pub const SUSPENDED_PAGE: &str = "/suspended";
pub const SUBSCRIPTION_PAGE: &str = "/subscription";

// Bloqueia tenants suspensos ou sem assinatura. API recebe JSON; navegador, redirect.
pub async fn subscription_gate(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(tenant) = request.extensions().get::<TenantContext>().cloned() else {
        return next.run(request).await;
    };
    if is_subscription_exempt(&path) {
        return next.run(request).await;
    }

    let status = app_state.subscription_gate.evaluate(&tenant.tenant).await;

    if !status.has_access {
        tracing::warn!(
            tenant_id = %tenant.id(),
            state = ?status.state,
            "Acesso bloqueado pela assinatura: {}",
            status.reason
        );
        let api = is_api_path(&path);
        return match (status.tenant_suspended, api) {
            (true, true) => AppError::TenantSuspended.into_response(),
            (true, false) => Redirect::to(SUSPENDED_PAGE).into_response(),
            (false, true) => AppError::SubscriptionRequired.into_response(),
            (false, false) => Redirect::to(SUBSCRIPTION_PAGE).into_response(),
        };
    }

    request.extensions_mut().insert(status);
    next.run(request).await
}
