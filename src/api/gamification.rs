use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::failure;
use crate::entities::{user_badge, prelude::*};
use crate::events::EventBus;
use crate::ledger;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardPointsRequest {
    pub user_id: i32,
    pub points: i32,
    pub reason: String,
}

// POST /internal/award-points. Service credential only; in-app awards go
// through the ledger directly.
pub async fn award_points(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Json(payload): Json<AwardPointsRequest>,
) -> Response {
    if payload.points <= 0 {
        return failure(StatusCode::BAD_REQUEST, "Points must be greater than 0");
    }

    let result = match ledger::award_points(&db, payload.user_id, payload.points, &payload.reason)
        .await
    {
        Ok(result) => result,
        Err(DbErr::RecordNotFound(_)) => {
            return failure(StatusCode::NOT_FOUND, "User not found")
        }
        Err(e) => {
            error!("Failed to award points to user {}: {}", payload.user_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to award points");
        }
    };

    let badges_unlocked = match ledger::evaluate_badge_unlocks(&db, payload.user_id).await {
        Ok(badges) => badges,
        Err(e) => {
            error!("Badge evaluation failed for user {}: {}", payload.user_id, e);
            Vec::new()
        }
    };

    bus.publish("points", payload.user_id, "awarded").await;
    for badge in &badges_unlocked {
        bus.publish("badge", badge.id, "unlocked").await;
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "points": result.points,
            "level": result.level,
            "leveledUp": result.leveled_up,
            "badgesUnlocked": badges_unlocked,
        })),
    )
        .into_response()
}

// GET /profile. Returns the caller's points, level, and unlocked badges.
pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    let user = match User::find_by_id(user_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!("Failed to fetch profile: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let badges = match UserBadge::find()
        .filter(user_badge::Column::UserId.eq(user_id))
        .find_also_related(Badge)
        .all(&db)
        .await
    {
        Ok(rows) => rows
            .into_iter()
            .filter_map(|(unlock, badge)| {
                badge.map(|b| {
                    json!({
                        "badge": b,
                        "unlockedAt": unlock.unlocked_at,
                    })
                })
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            error!("Failed to fetch badges for user {}: {}", user_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "profile": {
                "id": user.id,
                "name": user.name,
                "email": user.email,
                "phone": user.phone,
                "points": user.points,
                "level": user.level,
            },
            "badges": badges,
        })),
    )
        .into_response()
}
