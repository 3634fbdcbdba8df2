// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    common::{
        error::{ApiError, AppError},
        routes::is_authorization_exempt,
    },
    config::AppState,
    models::auth::UserPrincipal,
    services::auth::ClaimsDecoder,
};

// Decodifica o bearer token e insere o principal nos "extensions" da requisição.
// Sem token: segue sem principal, quem decide o 401 é o motor de autorização.
pub async fn authenticate(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = ClaimsDecoder::bearer(
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    )
    .map(str::to_string);

    if let Some(token) = token {
        match app_state.claims.decode(&token) {
            Ok(principal) => {
                request.extensions_mut().insert(principal);
            }
            Err(e) if !is_authorization_exempt(request.uri().path()) => {
                return e.into_response();
            }
            Err(_) => {}
        }
    }

    next.run(request).await
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub UserPrincipal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserPrincipal>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Unauthenticated.into())
    }
}
