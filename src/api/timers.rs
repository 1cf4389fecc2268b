use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::failure;
use crate::entities::{check_in_timer, prelude::*};
use crate::events::EventBus;
use crate::ledger;
use crate::sweeper;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimerRequest {
    pub duration_minutes: i32,
}

// POST /timers
pub async fn create_timer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<CreateTimerRequest>,
) -> Response {
    if payload.duration_minutes <= 0 {
        return failure(StatusCode::BAD_REQUEST, "durationMinutes must be greater than 0");
    }

    // Supersede any prior active timer silently; only the sweep escalates.
    let superseded = CheckInTimer::update_many()
        .col_expr(
            check_in_timer::Column::Status,
            Expr::value(check_in_timer::STATUS_EXPIRED),
        )
        .filter(check_in_timer::Column::UserId.eq(user_id))
        .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
        .exec(&db)
        .await;
    match superseded {
        Ok(result) if result.rows_affected > 0 => {
            tracing::info!(user_id, "superseded prior active check-in timer");
        }
        Ok(_) => {}
        Err(e) => {
            error!("Failed to supersede prior timer for user {}: {}", user_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create timer");
        }
    }

    let started_at = Utc::now().naive_utc();
    let new_timer = check_in_timer::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        duration_minutes: Set(payload.duration_minutes),
        started_at: Set(started_at),
        expires_at: Set(started_at + Duration::minutes(payload.duration_minutes as i64)),
        status: Set(check_in_timer::STATUS_ACTIVE.to_string()),
        created_at: Set(started_at),
    };

    match new_timer.insert(&db).await {
        Ok(timer) => {
            metrics::gauge!("safecircle_timers_active").increment(1.0);
            bus.publish("check_in_timer", timer.id, "created").await;
            (
                StatusCode::CREATED,
                Json(json!({"success": true, "timer": timer})),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to create check-in timer: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create timer")
        }
    }
}

// POST /timers/:id/check-in
pub async fn check_in(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(timer_id): Path<Uuid>,
) -> Response {
    // Conditional transition: only the owner's still-active timer checks in.
    let transition = CheckInTimer::update_many()
        .col_expr(
            check_in_timer::Column::Status,
            Expr::value(check_in_timer::STATUS_CHECKED_IN),
        )
        .filter(check_in_timer::Column::Id.eq(timer_id))
        .filter(check_in_timer::Column::UserId.eq(user_id))
        .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
        .exec(&db)
        .await;
    match transition {
        Ok(result) if result.rows_affected == 1 => {}
        Ok(_) => {
            return failure(
                StatusCode::NOT_FOUND,
                "Timer not found or already expired/checked in",
            )
        }
        Err(e) => {
            error!("Failed to check in timer {}: {}", timer_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to check in");
        }
    }

    metrics::gauge!("safecircle_timers_active").decrement(1.0);

    let timer = match CheckInTimer::find_by_id(timer_id).one(&db).await {
        Ok(Some(model)) => model,
        _ => return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reload timer"),
    };

    let points_awarded =
        match ledger::award_points(&db, user_id, ledger::POINTS_CHECK_IN, ledger::REASON_CHECK_IN)
            .await
        {
            Ok(_) => ledger::POINTS_CHECK_IN,
            Err(e) => {
                error!("Failed to award check-in points to user {}: {}", user_id, e);
                0
            }
        };

    bus.publish("check_in_timer", timer_id, "checked_in").await;

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "timer": timer,
            "pointsAwarded": points_awarded,
        })),
    )
        .into_response()
}

// GET /timers/active
pub async fn get_active_timer(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match CheckInTimer::find()
        .filter(check_in_timer::Column::UserId.eq(user_id))
        .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
        .order_by_desc(check_in_timer::Column::CreatedAt)
        .one(&db)
        .await
    {
        Ok(timer) => (
            StatusCode::OK,
            Json(json!({"success": true, "timer": timer})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to fetch active timer: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch timer")
        }
    }
}

// POST /internal/check-expired. Service credential, normally driven by the
// sweeper binary or an external scheduler.
pub async fn check_expired(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
) -> Response {
    match sweeper::run_sweep(&db, &bus).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "expiredCount": outcome.expired_count,
                "alertsCreated": outcome.alerts_created,
                "results": outcome.results,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Expiry sweep failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Expiry sweep failed")
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod mock_tests {
    use super::*;
    use crate::events::EventBus;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    fn test_bus() -> EventBus {
        EventBus::new(redis::Client::open("redis://127.0.0.1:6399").unwrap())
    }

    #[tokio::test]
    async fn second_timer_supersedes_prior_active() {
        let started = Utc::now().naive_utc();
        let replacement = check_in_timer::Model {
            id: Uuid::new_v4(),
            user_id: 7,
            duration_minutes: 30,
            started_at: started,
            expires_at: started + Duration::minutes(30),
            status: check_in_timer::STATUS_ACTIVE.to_string(),
            created_at: started,
        };
        // The prior active timer is expired (one row hit) before the
        // replacement is inserted.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![replacement]])
            .into_connection();

        let response = create_timer(
            Extension(db),
            Extension(test_bus()),
            Extension(7),
            Json(CreateTimerRequest {
                duration_minutes: 30,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn supersede_failure_blocks_timer_creation() {
        // The supersede update runs first; when it fails no new timer is
        // written, so a user can never hold two active timers.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("supersede failed".to_string())])
            .into_connection();

        let response = create_timer(
            Extension(db),
            Extension(test_bus()),
            Extension(7),
            Json(CreateTimerRequest {
                duration_minutes: 30,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
