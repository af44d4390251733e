use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn root() -> &'static str {
    "E-Vaccination Backend Server is Running"
}

/// Connectivity probe used by the front-end.
pub async fn connectivity() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Backend is connected and working!",
        "timestamp": Utc::now(),
    }))
}
