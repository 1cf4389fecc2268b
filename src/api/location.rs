use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::failure;
use crate::entities::{user_location, prelude::*};
use crate::events::EventBus;

/// Upsert a user's shared position, keyed by user id.
pub async fn upsert_location(
    db: &DatabaseConnection,
    user_id: i32,
    latitude: f64,
    longitude: f64,
    is_sharing: bool,
) -> Result<user_location::Model, DbErr> {
    UserLocation::insert(user_location::ActiveModel {
        user_id: Set(user_id),
        latitude: Set(latitude),
        longitude: Set(longitude),
        is_sharing: Set(is_sharing),
        updated_at: Set(Utc::now().naive_utc()),
    })
    .on_conflict(
        OnConflict::column(user_location::Column::UserId)
            .update_columns([
                user_location::Column::Latitude,
                user_location::Column::Longitude,
                user_location::Column::IsSharing,
                user_location::Column::UpdatedAt,
            ])
            .to_owned(),
    )
    .exec_with_returning(db)
    .await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub is_sharing: Option<bool>,
}

// POST /location
pub async fn update_location(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Response {
    if !payload.latitude.is_finite()
        || !payload.longitude.is_finite()
        || !(-90.0..=90.0).contains(&payload.latitude)
        || !(-180.0..=180.0).contains(&payload.longitude)
    {
        return failure(StatusCode::BAD_REQUEST, "Invalid coordinates");
    }

    match upsert_location(
        &db,
        user_id,
        payload.latitude,
        payload.longitude,
        payload.is_sharing.unwrap_or(true),
    )
    .await
    {
        Ok(location) => {
            bus.publish("user_location", user_id, "updated").await;
            (
                StatusCode::OK,
                Json(json!({"success": true, "location": location})),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to update location for user {}: {}", user_id, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update location")
        }
    }
}
