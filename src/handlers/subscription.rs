// src/handlers/subscription.rs

use axum::{extract::State, Json};

use crate::{
    config::AppState,
    models::{subscription::SubscriptionStatus, tenancy::TenantContext},
};

// GET /api/v1/subscriptions/status
// Fica fora do bloqueio de assinatura para o cliente saber o que pagar.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/status",
    tag = "Subscriptions",
    responses(
        (status = 200, description = "Estado da assinatura da farmácia", body = SubscriptionStatus),
        (status = 403, description = "Sem permissão")
    ),
    params(("x-tenant-id" = String, Header, description = "ID ou subdomínio da farmácia")),
    security(("api_jwt" = []))
)]
pub async fn get_status(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Json<SubscriptionStatus> {
    Json(app_state.subscription_gate.evaluate(&tenant.tenant).await)
}
