// src/middleware/csrf.rs

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    common::{error::AppError, routes::is_api_path},
    config::AppState,
    models::security::{RequestOrigin, RiskLevel, SecurityEvent, SecurityEventType},
};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Double-submit: header `X-CSRF-Token` tem que ser igual ao cookie `csrf_token`.
/// Vale para navegador (fora de /api/ ou com cookie); chamadas com bearer ficam de fora.
pub fn csrf_check(method: &Method, path: &str, headers: &HeaderMap) -> Result<(), AppError> {
    if is_safe(method) || headers.contains_key(header::AUTHORIZATION) {
        return Ok(());
    }

    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    if cookie.is_none() && is_api_path(path) {
        return Ok(());
    }

    let sent = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (cookie.as_deref(), sent) {
        (Some(expected), Some(sent)) if !expected.is_empty() && expected == sent => Ok(()),
        _ => Err(AppError::CsrfMismatch),
    }
}

pub async fn csrf_guard(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    if let Err(e) = csrf_check(request.method(), request.uri().path(), request.headers()) {
        tracing::warn!(path = %request.uri().path(), "Token CSRF ausente ou divergente");
        if let Some(origin) = request.extensions().get::<RequestOrigin>() {
            app_state.audit.emit(
                SecurityEvent::new(
                    SecurityEventType::SecurityViolation,
                    RiskLevel::Medium,
                    "CSRF token mismatch",
                    origin,
                )
                .with_meta("method", request.method().as_str()),
            );
        }
        return e.into_response();
    }
    next.run(request).await
}
