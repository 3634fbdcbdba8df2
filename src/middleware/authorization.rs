// src/middleware/authorization.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    common::{error::AppError, routes::RouteTarget},
    config::AppState,
    models::{
        auth::UserPrincipal,
        security::{mask_id, RequestOrigin, RiskLevel, SecurityEvent, SecurityEventType},
        tenancy::TenantContext,
    },
    services::authorization::{Decision, DenyReason},
};

fn risk_for(reason: DenyReason) -> RiskLevel {
    match reason {
        DenyReason::AuthenticationRequired => RiskLevel::Low,
        DenyReason::RoleNotPermitted | DenyReason::BranchNotPermitted => RiskLevel::Medium,
        DenyReason::TenantMismatch => RiskLevel::High,
    }
}

// Última etapa antes do handler: decisão final de allow/deny.
pub async fn authorize(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    let route = RouteTarget::new(request.uri().path(), request.method().clone());
    let principal = request.extensions().get::<UserPrincipal>();
    let tenant = request.extensions().get::<TenantContext>();

    let decision = match app_state.authorizer.authorize(principal, tenant, &route).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::error!(path = %route.path, "Falha na autorização: {}", e);
            return e.into_response();
        }
    };

    let Decision::Deny(denial) = decision else {
        return next.run(request).await;
    };
    tracing::warn!(
        path = %route.path,
        method = %route.method,
        reason = denial.reason.code(),
        "Acesso negado"
    );

    let origin = request
        .extensions()
        .get::<RequestOrigin>()
        .cloned()
        .unwrap_or_else(|| RequestOrigin {
            ip_address: "unknown".to_string(),
            user_agent: None,
            path: route.path.clone(),
        });

    let mut event = SecurityEvent::new(
        SecurityEventType::UnauthorizedAccess,
        risk_for(denial.reason),
        denial.reason.to_string(),
        &origin,
    )
    .with_user(principal.map(|p| p.user_id))
    .with_meta("reason", denial.reason.code())
    .with_meta("method", route.method.as_str());

    if let Some(p) = principal {
        event = event
            .with_meta("role", p.role.as_str())
            .with_meta("userId", mask_id(p.user_id))
            .with_meta("claimTenantId", p.tenant_id.map(mask_id));
    }
    if let Some(t) = tenant {
        event = event.with_meta("resolvedTenantId", mask_id(t.id()));
    }
    app_state.audit.emit(event);

    AppError::from(&denial).into_response()
}
