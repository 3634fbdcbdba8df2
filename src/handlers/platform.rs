// src/handlers/platform.rs

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        security::{mask_id, RequestOrigin, RiskLevel, SecurityEvent, SecurityEventType},
        tenancy::{TenantRecord, TenantStatus},
    },
};

async fn change_status(
    app_state: &AppState,
    actor: &AuthenticatedUser,
    origin: &RequestOrigin,
    tenant_id: Uuid,
    status: TenantStatus,
) -> Result<Json<TenantRecord>, ApiError> {
    let tenant = app_state
        .tenants
        .set_status(tenant_id, status)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    tracing::info!(
        tenant_id = %tenant.id,
        actor = %actor.0.user_id,
        status = status.as_str(),
        "Status do tenant alterado"
    );

    let description = match status {
        TenantStatus::Suspended => "Tenant suspended",
        TenantStatus::Active => "Tenant reinstated",
    };
    app_state.audit.emit(
        SecurityEvent::new(
            SecurityEventType::TenantStatusChanged,
            RiskLevel::Medium,
            description,
            origin,
        )
        .with_user(Some(actor.0.user_id))
        .with_meta("actorId", mask_id(actor.0.user_id))
        .with_meta("targetTenantId", tenant.id.to_string())
        .with_meta("status", status.as_str()),
    );

    Ok(Json(tenant))
}

// POST /api/v1/platform/tenants/{id}/suspend
#[utoipa::path(
    post,
    path = "/api/v1/platform/tenants/{id}/suspend",
    tag = "Platform",
    responses(
        (status = 200, description = "Tenant suspenso", body = TenantRecord),
        (status = 403, description = "Apenas SuperAdmin"),
        (status = 404, description = "Tenant não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do tenant")),
    security(("api_jwt" = []))
)]
pub async fn suspend_tenant(
    State(app_state): State<AppState>,
    Extension(origin): Extension<RequestOrigin>,
    actor: AuthenticatedUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<TenantRecord>, ApiError> {
    change_status(&app_state, &actor, &origin, tenant_id, TenantStatus::Suspended).await
}

// POST /api/v1/platform/tenants/{id}/reinstate
#[utoipa::path(
    post,
    path = "/api/v1/platform/tenants/{id}/reinstate",
    tag = "Platform",
    responses(
        (status = 200, description = "Tenant reativado", body = TenantRecord),
        (status = 403, description = "Apenas SuperAdmin"),
        (status = 404, description = "Tenant não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do tenant")),
    security(("api_jwt" = []))
)]
pub async fn reinstate_tenant(
    State(app_state): State<AppState>,
    Extension(origin): Extension<RequestOrigin>,
    actor: AuthenticatedUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<TenantRecord>, ApiError> {
    change_status(&app_state, &actor, &origin, tenant_id, TenantStatus::Active).await
}
