use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": chrono::Utc::now().to_rfc3339() }))
}
