// src/routes.rs

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    common::error::ApiError,
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth, authorization, csrf, security, subscription, tenancy},
};

fn panic_response(_payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred.").into_response()
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found.")
}

/// Envolve o router no pipeline, na ordem fixa:
/// sentinel -> csrf -> tenant -> autenticação -> assinatura -> autorização -> handler.
pub fn with_pipeline(router: Router, app_state: AppState) -> Router {
    router.fallback(not_found).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                security::security_sentinel,
            ))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                csrf::csrf_guard,
            ))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                tenancy::tenant_resolver,
            ))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth::authenticate,
            ))
            .layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                subscription::subscription_gate,
            ))
            .layer(axum_middleware::from_fn_with_state(
                app_state,
                authorization::authorize,
            )),
    )
}

/// Rotas da aplicação, ainda sem o pipeline.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/v1/auth/me", get(handlers::auth::get_me))
        .route(
            "/api/v1/session/context",
            get(handlers::session::get_session_context),
        )
        .route(
            "/api/v1/subscriptions/status",
            get(handlers::subscription::get_status),
        )
        .route(
            "/api/v1/platform/tenants/{id}/suspend",
            post(handlers::platform::suspend_tenant),
        )
        .route(
            "/api/v1/platform/tenants/{id}/reinstate",
            post(handlers::platform::reinstate_tenant),
        )
        .route("/suspended", get(handlers::pages::suspended_page))
        .route("/subscription", get(handlers::pages::subscription_page))
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

pub fn router(app_state: AppState) -> Router {
    with_pipeline(routes(app_state.clone()), app_state)
}
