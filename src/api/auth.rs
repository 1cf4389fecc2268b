use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use tracing::field::display;

use super::{failure, middleware::SESSION_COOKIE};
use crate::entities::user;

#[derive(serde::Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    name: String,
    phone: Option<String>,
}

pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = match argon2.hash_password(payload.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(_) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to hash password",
            )
        }
    };

    let now = chrono::Utc::now().naive_utc();
    let new_user = user::ActiveModel {
        email: Set(payload.email),
        password_hash: Set(password_hash),
        name: Set(payload.name),
        phone: Set(payload.phone),
        points: Set(0),
        level: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(user) => {
            tracing::Span::current()
                .record("action", "register_user")
                .record("user_id", user.id);

            metrics::counter!("safecircle_users_registered_total").increment(1);
            metrics::gauge!("safecircle_users_total").increment(1.0);

            (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "id": user.id,
                    "email": user.email,
                    "name": user.name
                })),
            )
                .into_response()
        }
        Err(e) => {
            // Postgres unique-violation on the email column.
            if e.to_string()
                .contains("duplicate key value violates unique constraint")
            {
                return failure(StatusCode::CONFLICT, "Email already exists");
            }

            tracing::Span::current()
                .record("action", "register_user_error")
                .record("error", display(&e));
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to register user")
        }
    }
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let user = match user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.clone()))
        .one(&db)
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => return failure(StatusCode::UNAUTHORIZED, "Invalid email or password"),
        Err(e) => {
            tracing::error!("Failed to look up user: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(h) => h,
        Err(_) => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid password hash in DB",
            )
        }
    };

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        let mut cookie = Cookie::new(SESSION_COOKIE, user.id.to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookies.add(cookie);

        tracing::Span::current()
            .record("action", "login_user")
            .record("user_id", user.id);

        (
            StatusCode::OK,
            Json(json!({"success": true, "message": "Login successful"})),
        )
            .into_response()
    } else {
        failure(StatusCode::UNAUTHORIZED, "Invalid email or password")
    }
}
