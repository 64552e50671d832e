use axum::{response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::response::no_content;

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// Liveness probe for load balancers.
pub async fn healthcheck() -> impl IntoResponse {
    no_content()
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "courier-dispatch",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
