// src/handlers/health.rs

use axum::Json;
use serde_json::{json, Value};

// GET /health
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Serviço no ar"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}
