// src/middleware/security.rs

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use serde_json::json;
use std::{any::Any, net::SocketAddr, panic::AssertUnwindSafe, time::Instant};

use crate::{
    common::error::ApiError,
    config::AppState,
    models::security::{RequestOrigin, RiskLevel, SecurityEvent, SecurityEventType},
    services::security_sentinel::{client_ip, Inspection},
};

const MAX_PANIC_MESSAGE: usize = 200;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    message.chars().take(MAX_PANIC_MESSAGE).collect()
}

// Primeira etapa do pipeline: bloqueio por IP, heurísticas, pânicos e lentidão.
pub async fn security_sentinel(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let origin = RequestOrigin {
        ip_address: client_ip(request.headers(), socket),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        path: request.uri().path().to_string(),
    };
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| origin.path.clone());

    let inspection = app_state
        .sentinel
        .inspect(&origin, &path_and_query)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Falha ao consultar a lista de bloqueio: {}", e);
            Inspection::default()
        });

    if let Some(block) = &inspection.block {
        app_state.audit.emit(
            SecurityEvent::new(
                SecurityEventType::UnauthorizedAccess,
                RiskLevel::High,
                "Request from blocked IP address",
                &origin,
            )
            .with_meta("blockReason", block.reason.clone()),
        );
        return ApiError::new(StatusCode::FORBIDDEN, "Access denied.").into_response();
    }

    if inspection.suspicious {
        app_state.audit.emit(
            SecurityEvent::new(
                SecurityEventType::SuspiciousActivity,
                RiskLevel::Medium,
                "Suspicious request pattern detected",
                &origin,
            )
            .with_meta("score", inspection.score)
            .with_meta("findings", json!(inspection.findings)),
        );
    }

    request.extensions_mut().insert(origin.clone());

    let started = Instant::now();
    let outcome = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(response) => {
            // Só o status vai para a auditoria; o detalhe do erro fica no log.
            if response.status().is_server_error() {
                app_state.audit.emit(
                    SecurityEvent::new(
                        SecurityEventType::SecurityViolation,
                        RiskLevel::High,
                        "Request failed with a server error",
                        &origin,
                    )
                    .with_meta("exceptionType", "server_error")
                    .with_meta("status", response.status().as_u16()),
                );
            }
            if elapsed > app_state.settings.slow_request_threshold {
                app_state.audit.emit(
                    SecurityEvent::new(
                        SecurityEventType::RateLimitExceeded,
                        RiskLevel::Low,
                        "Slow request",
                        &origin,
                    )
                    .with_meta("durationMs", elapsed.as_millis() as u64)
                    .with_meta("status", response.status().as_u16()),
                );
            }
            response
        }
        Err(payload) => {
            app_state.audit.emit(
                SecurityEvent::new(
                    SecurityEventType::SecurityViolation,
                    RiskLevel::High,
                    "Unhandled failure while processing request",
                    &origin,
                )
                .with_meta("exceptionType", "panic")
                .with_meta("message", panic_message(payload.as_ref())),
            );
            // Devolve o pânico para o CatchPanicLayer responder 500.
            std::panic::resume_unwind(payload)
        }
    }
}
