use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use super::failure;

pub const SESSION_COOKIE: &str = "safecircle_user";

/// End-user authentication: the session cookie carries the caller's user id,
/// which is injected as an Extension for handlers.
pub async fn auth_middleware(cookies: Cookies, mut request: Request, next: Next) -> Response {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Ok(user_id) = cookie.value().parse::<i32>() {
            request.extensions_mut().insert(user_id);
            return next.run(request).await;
        }
    }
    failure(StatusCode::UNAUTHORIZED, "Unauthorized")
}

/// Internal/admin endpoints (expiry sweep, point grants) require the shared
/// service key, not an end-user session.
pub async fn service_auth_middleware(request: Request, next: Next) -> Response {
    let expected = match std::env::var("SERVICE_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            tracing::error!("SERVICE_KEY is not configured; rejecting internal request");
            return failure(StatusCode::UNAUTHORIZED, "Service credential not configured");
        }
    };

    let provided = request
        .headers()
        .get("x-service-key")
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == expected => next.run(request).await,
        _ => failure(StatusCode::UNAUTHORIZED, "Invalid service credential"),
    }
}
