use axum::Json;
use serde_json::{Value, json};

pub mod file;
pub mod upload;

pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Welcome to a file server" }))
}
