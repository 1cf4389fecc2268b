use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::failure;
use crate::entities::{trusted_circle, prelude::*};
use crate::events::EventBus;
use crate::ledger;

// GET /circle. Every edge the caller is on, split the way clients consume
// them: accepted contacts vs. requests still pending.
pub async fn list_circle(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    let edges = match TrustedCircle::find()
        .filter(
            Condition::any()
                .add(trusted_circle::Column::UserId.eq(user_id))
                .add(trusted_circle::Column::TrustedUserId.eq(user_id)),
        )
        .all(&db)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch trusted circle: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch circle");
        }
    };

    let (accepted, rest): (Vec<_>, Vec<_>) = edges
        .into_iter()
        .partition(|e| e.status == trusted_circle::STATUS_ACCEPTED);
    let pending: Vec<_> = rest
        .into_iter()
        .filter(|e| e.status == trusted_circle::STATUS_PENDING)
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "contacts": accepted,
            "pendingRequests": pending,
        })),
    )
        .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactRequest {
    pub trusted_user_id: i32,
}

// POST /circle
pub async fn add_trusted_contact(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<AddContactRequest>,
) -> Response {
    if payload.trusted_user_id == user_id {
        return failure(StatusCode::BAD_REQUEST, "Cannot add yourself to your circle");
    }

    match User::find_by_id(payload.trusted_user_id).one(&db).await {
        Ok(Some(_)) => {}
        Ok(None) => return failure(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!("Failed to look up user: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    }

    let edge = trusted_circle::ActiveModel {
        user_id: Set(user_id),
        trusted_user_id: Set(payload.trusted_user_id),
        status: Set(trusted_circle::STATUS_PENDING.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };

    match edge.insert(&db).await {
        Ok(created) => {
            bus.publish("trusted_circle", created.id, "requested").await;
            (
                StatusCode::CREATED,
                Json(json!({"success": true, "contact": created})),
            )
                .into_response()
        }
        Err(e)
            if e.to_string()
                .contains("duplicate key value violates unique constraint") =>
        {
            failure(StatusCode::CONFLICT, "Trust request already exists")
        }
        Err(e) => {
            error!("Failed to create trust request: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create request")
        }
    }
}

// POST /circle/:id/accept. Acceptance is always by the trusted side acting
// on a row the owning side created.
pub async fn accept_request(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(edge_id): Path<i32>,
) -> Response {
    let transition = TrustedCircle::update_many()
        .col_expr(
            trusted_circle::Column::Status,
            Expr::value(trusted_circle::STATUS_ACCEPTED),
        )
        .filter(trusted_circle::Column::Id.eq(edge_id))
        .filter(trusted_circle::Column::TrustedUserId.eq(user_id))
        .filter(trusted_circle::Column::Status.eq(trusted_circle::STATUS_PENDING))
        .exec(&db)
        .await;
    match transition {
        Ok(result) if result.rows_affected == 1 => {}
        Ok(_) => return failure(StatusCode::NOT_FOUND, "Pending request not found"),
        Err(e) => {
            error!("Failed to accept trust request {}: {}", edge_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to accept request");
        }
    }

    let points_awarded = match ledger::award_points(
        &db,
        user_id,
        ledger::POINTS_TRUSTED_CIRCLE_ACCEPT,
        ledger::REASON_TRUSTED_CIRCLE_ACCEPT,
    )
    .await
    {
        Ok(_) => {
            if let Err(e) = ledger::evaluate_badge_unlocks(&db, user_id).await {
                error!("Badge evaluation failed for user {}: {}", user_id, e);
            }
            ledger::POINTS_TRUSTED_CIRCLE_ACCEPT
        }
        Err(e) => {
            error!("Failed to award accept points to user {}: {}", user_id, e);
            0
        }
    };

    bus.publish("trusted_circle", edge_id, "accepted").await;

    match TrustedCircle::find_by_id(edge_id).one(&db).await {
        Ok(Some(edge)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "contact": edge,
                "pointsAwarded": points_awarded,
            })),
        )
            .into_response(),
        _ => failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reload contact"),
    }
}

// POST /circle/:id/reject
pub async fn reject_request(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(edge_id): Path<i32>,
) -> Response {
    let transition = TrustedCircle::update_many()
        .col_expr(
            trusted_circle::Column::Status,
            Expr::value(trusted_circle::STATUS_REJECTED),
        )
        .filter(trusted_circle::Column::Id.eq(edge_id))
        .filter(trusted_circle::Column::TrustedUserId.eq(user_id))
        .filter(trusted_circle::Column::Status.eq(trusted_circle::STATUS_PENDING))
        .exec(&db)
        .await;
    match transition {
        Ok(result) if result.rows_affected == 1 => {
            bus.publish("trusted_circle", edge_id, "rejected").await;
            (
                StatusCode::OK,
                Json(json!({"success": true, "message": "Request rejected"})),
            )
                .into_response()
        }
        Ok(_) => failure(StatusCode::NOT_FOUND, "Pending request not found"),
        Err(e) => {
            error!("Failed to reject trust request {}: {}", edge_id, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reject request")
        }
    }
}

// DELETE /circle/:id. Either side can sever the edge.
pub async fn remove_contact(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(edge_id): Path<i32>,
) -> Response {
    let deleted = TrustedCircle::delete_many()
        .filter(trusted_circle::Column::Id.eq(edge_id))
        .filter(
            Condition::any()
                .add(trusted_circle::Column::UserId.eq(user_id))
                .add(trusted_circle::Column::TrustedUserId.eq(user_id)),
        )
        .exec(&db)
        .await;
    match deleted {
        Ok(result) if result.rows_affected == 1 => {
            bus.publish("trusted_circle", edge_id, "removed").await;
            (
                StatusCode::OK,
                Json(json!({"success": true, "message": "Contact removed"})),
            )
                .into_response()
        }
        Ok(_) => failure(StatusCode::NOT_FOUND, "Contact not found"),
        Err(e) => {
            error!("Failed to remove contact {}: {}", edge_id, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to remove contact")
        }
    }
}
