// src/handlers/session.rs

use axum::{extract::State, Json};
use futures::FutureExt;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::ApiError,
    config::AppState,
    db::session::SessionConnection,
    middleware::auth::AuthenticatedUser,
    models::{
        session::{DbSessionContext, UnitOfWork},
        tenancy::TenantContext,
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionContextResponse {
    pub success: bool,
    pub requested: DbSessionContext,
    // O que a conexão devolveu de `current_setting` durante a unidade de trabalho.
    pub bound: Option<DbSessionContext>,
}

// GET /api/v1/session/context
#[utoipa::path(
    get,
    path = "/api/v1/session/context",
    tag = "Session",
    responses(
        (status = 200, description = "Contexto RLS vinculado na conexão", body = SessionContextResponse),
        (status = 401, description = "Não autenticado"),
        (status = 403, description = "Sem acesso à farmácia"),
        (status = 502, description = "Pool de conexões indisponível")
    ),
    params(("x-tenant-id" = String, Header, description = "ID ou subdomínio da farmácia")),
    security(("api_jwt" = []))
)]
pub async fn get_session_context(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<SessionContextResponse>, ApiError> {
    let requested = DbSessionContext::for_request(&tenant, &user.0);

    let bound = app_state
        .binder
        .with_bound_context(&requested, UnitOfWork::Session, |conn| {
            async move { conn.current_context().await }.boxed()
        })
        .await?;

    Ok(Json(SessionContextResponse {
        success: true,
        requested,
        bound,
    }))
}
