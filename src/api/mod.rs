pub mod auth;
pub mod circle;
pub mod gamification;
pub mod incidents;
pub mod location;
pub mod middleware;
pub mod timers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure body shape shared by every endpoint.
pub fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "error": message}))).into_response()
}
