// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

// Erro interno da aplicação. Nunca sai direto para o cliente:
// sempre passa por `ApiError` (envelope `success: false`).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Tenant identifier is required")]
    MissingTenant,

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Tenant is suspended")]
    TenantSuspended,

    #[error("Active subscription required")]
    SubscriptionRequired,

    #[error("Invalid CSRF token")]
    CsrfMismatch,

    // Falha ao vincular o contexto RLS na conexão: aborta (fail-closed).
    #[error("Failed to bind database session context: {0}")]
    ContextBinding(String),

    // A pool de conexões não respondeu.
    #[error("Downstream failure: {0}")]
    Downstream(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),
}

// O que efetivamente vira resposta HTTP.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::TenantSuspended | AppError::CsrfMismatch => {
                StatusCode::FORBIDDEN
            }
            AppError::MissingTenant => StatusCode::BAD_REQUEST,
            AppError::TenantNotFound => StatusCode::NOT_FOUND,
            AppError::SubscriptionRequired => StatusCode::PAYMENT_REQUIRED,
            AppError::Downstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ContextBinding(_)
            | AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let status = self.status();
        match self {
            AppError::TenantSuspended => ApiError::new(
                status,
                "This pharmacy account is suspended. Please contact support.",
            )
            .with_details(json!({ "tenantSuspended": true })),
            AppError::SubscriptionRequired => ApiError::new(
                status,
                "An active subscription is required to continue.",
            )
            .with_details(json!({ "subscriptionRequired": true })),
            AppError::Forbidden(reason) => ApiError::new(status, reason.clone()),
            e if status.is_server_error() => {
                // O detalhe fica só no log.
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                let message = if status == StatusCode::BAD_GATEWAY {
                    "Upstream service unavailable."
                } else {
                    "An unexpected error occurred."
                };
                ApiError::new(status, message)
            }
            e => ApiError::new(status, e.to_string()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("message".into(), Value::String(self.message));

        if let Some(Value::Object(details)) = self.details {
            for (key, value) in details {
                body.entry(key).or_insert(value);
            }
        }

        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn suspended_tenant_carries_flag_in_envelope() {
        let resp = AppError::TenantSuspended.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let body = body_of(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["tenantSuspended"], true);
        assert!(body["message"].as_str().unwrap().contains("suspended"));
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let resp = AppError::ContextBinding("set_config failed: secret".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(resp).await;
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::SubscriptionRequired.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(AppError::CsrfMismatch.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Downstream("pool".into()).status(), StatusCode::BAD_GATEWAY);
    }
}
