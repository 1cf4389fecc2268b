use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, Set, Statement,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use super::{failure, location::upsert_location};
use crate::entities::{incident, incident_helper, prelude::*};
use crate::events::EventBus;
use crate::ledger;
use crate::metrics as domain_metrics;
use crate::notify;
use crate::proximity;

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Persisted total order: earliest responded_at wins, serial row id breaks
/// wall-clock ties deterministically.
fn first_responder_id(responses: &[incident_helper::Model]) -> Option<i32> {
    responses
        .iter()
        .min_by_key(|r| (r.responded_at, r.id))
        .map(|r| r.helper_id)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerIncidentRequest {
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub emergency_type: Option<String>,
    pub voice_note_url: Option<String>,
    pub is_silent: Option<bool>,
    pub auto_contact: Option<bool>,
}

// POST /incidents
pub async fn trigger_incident(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<TriggerIncidentRequest>,
) -> Response {
    if !incident::is_valid_kind(&payload.kind) {
        return failure(StatusCode::BAD_REQUEST, "Invalid incident kind");
    }

    // Helper-proximity matching needs a real position; a caller that cannot
    // geolocate must retry rather than raise an unlocatable incident.
    let (latitude, longitude) = match (payload.latitude, payload.longitude) {
        (Some(lat), Some(lng)) if valid_coordinates(lat, lng) => (lat, lng),
        _ => {
            return failure(
                StatusCode::BAD_REQUEST,
                "Location unavailable: a valid latitude and longitude are required",
            )
        }
    };

    let auto_contact = payload.auto_contact.unwrap_or(false);
    let new_incident = incident::ActiveModel {
        id: Set(Uuid::new_v4()),
        reporter_id: Set(user_id),
        kind: Set(payload.kind.clone()),
        emergency_type: Set(payload.emergency_type),
        status: Set(incident::STATUS_ACTIVE.to_string()),
        latitude: Set(Some(latitude)),
        longitude: Set(Some(longitude)),
        description: Set(payload.description),
        voice_note_url: Set(payload.voice_note_url),
        is_silent: Set(payload.is_silent.unwrap_or(false)),
        auto_contact: Set(auto_contact),
        created_at: Set(Utc::now().naive_utc()),
        resolved_at: Set(None),
    };

    let created = match new_incident.insert(&db).await {
        Ok(model) => model,
        Err(e) => {
            error!("Failed to create incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create incident");
        }
    };

    tracing::Span::current()
        .record("action", "trigger_incident")
        .record("incident_id", tracing::field::display(created.id))
        .record("user_id", user_id);
    domain_metrics::incident_opened(&payload.kind);

    // Everything past this point is best-effort: the incident record is the
    // safety-critical artifact and side-effect failures must not undo it.
    let notified_trusted = match notify::fan_out_trusted_circle(&db, created.id, user_id).await {
        Ok(count) => count,
        Err(e) => {
            error!("Trusted-circle fan-out failed for incident {}: {}", created.id, e);
            0
        }
    };

    if auto_contact {
        if let Err(e) = notify::record_emergency_services_contact(&db, created.id, user_id).await {
            error!(
                "Failed to record emergency-services contact for incident {}: {}",
                created.id, e
            );
        } else {
            bus.publish("incident", created.id, "emergency_services_requested")
                .await;
        }
    }

    let nearby_count = match proximity::find_nearby_helpers(
        &db,
        latitude,
        longitude,
        proximity::radius_km_from_env(),
        user_id,
    )
    .await
    {
        Ok(helpers) => {
            let ids: Vec<i32> = helpers.iter().map(|h| h.user_id).collect();
            match notify::record_nearby_helpers(&db, created.id, &ids).await {
                Ok(count) => count,
                Err(e) => {
                    error!("Failed to record nearby helpers for incident {}: {}", created.id, e);
                    0
                }
            }
        }
        Err(e) => {
            error!("Nearby-helper lookup failed for incident {}: {}", created.id, e);
            0
        }
    };

    // Raising an incident implicitly starts location sharing.
    if let Err(e) = upsert_location(&db, user_id, latitude, longitude, true).await {
        error!("Failed to update reporter location for incident {}: {}", created.id, e);
    }

    bus.publish("incident", created.id, "created").await;

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "incident": created,
            "notifiedTrustedCount": notified_trusted,
            "nearbyHelperCount": nearby_count,
        })),
    )
        .into_response()
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RespondBody {
    success: bool,
    response: incident_helper::Model,
    points_awarded: i32,
    badges_unlocked: Vec<crate::entities::badge::Model>,
    is_first_responder: bool,
}

// POST /incidents/:id/respond
pub async fn respond_to_incident(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(incident_id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Response {
    let target = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Incident not found"),
        Err(e) => {
            error!("Failed to fetch incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    if target.status != incident::STATUS_ACTIVE {
        return failure(StatusCode::CONFLICT, "Incident is no longer active");
    }

    if let (Some(lat), Some(lng)) = (payload.latitude, payload.longitude) {
        if valid_coordinates(lat, lng) {
            if let Err(e) = upsert_location(&db, user_id, lat, lng, true).await {
                error!("Failed to update helper location: {}", e);
            }
        }
    }

    let existing = match IncidentHelper::find()
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .filter(incident_helper::Column::HelperId.eq(user_id))
        .one(&db)
        .await
    {
        Ok(row) => row,
        Err(e) => {
            error!("Failed to fetch helper response: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    if let Some(row) = existing {
        return refresh_response(&db, &bus, row).await;
    }

    // Conditional insert keyed on the incident still being active, closing
    // the window between the status check above and this write.
    let inserted = incident_helper::Model::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO incident_helpers (incident_id, helper_id, status, responded_at) \
         SELECT $1, $2, $3, $4 \
         WHERE EXISTS (SELECT 1 FROM incidents WHERE id = $1 AND status = $5) \
         RETURNING id, incident_id, helper_id, status, responded_at, arrived_at, rating, \
                   actions_taken, thank_you_note",
        [
            incident_id.into(),
            user_id.into(),
            incident_helper::STATUS_RESPONDING.into(),
            Utc::now().naive_utc().into(),
            incident::STATUS_ACTIVE.into(),
        ],
    ))
    .one(&db)
    .await;

    let response = match inserted {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::CONFLICT, "Incident is no longer active"),
        // A concurrent respond by the same helper won the insert; fall back
        // to the idempotent refresh path.
        Err(e) if e.to_string().contains("duplicate key value violates unique constraint") => {
            match IncidentHelper::find()
                .filter(incident_helper::Column::IncidentId.eq(incident_id))
                .filter(incident_helper::Column::HelperId.eq(user_id))
                .one(&db)
                .await
            {
                Ok(Some(row)) => return refresh_response(&db, &bus, row).await,
                _ => return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error"),
            }
        }
        Err(e) => {
            error!("Failed to record helper response: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record response");
        }
    };

    // Classify against every persisted response for this incident. When the
    // read fails the caller gets the backup award: an unreadable ordering
    // must never hand two racing helpers the first-responder bonus.
    let is_first = match IncidentHelper::find()
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .order_by_asc(incident_helper::Column::RespondedAt)
        .order_by_asc(incident_helper::Column::Id)
        .all(&db)
        .await
    {
        Ok(rows) => first_responder_id(&rows) == Some(user_id),
        Err(e) => {
            error!("Failed to fetch responses for classification: {}", e);
            false
        }
    };

    let (points, reason) = if is_first {
        (ledger::POINTS_FIRST_RESPONDER, ledger::REASON_FIRST_RESPONDER)
    } else {
        (ledger::POINTS_SOS_RESPONSE, ledger::REASON_SOS_RESPONSE)
    };
    let points_awarded = match ledger::award_points(&db, user_id, points, reason).await {
        Ok(_) => points,
        Err(e) => {
            error!("Failed to award response points to user {}: {}", user_id, e);
            0
        }
    };

    let badges_unlocked = match ledger::evaluate_badge_unlocks(&db, user_id).await {
        Ok(badges) => badges,
        Err(e) => {
            error!("Badge evaluation failed for user {}: {}", user_id, e);
            Vec::new()
        }
    };

    domain_metrics::helper_responded(is_first);
    bus.publish("helper_response", response.id, "created").await;
    for badge in &badges_unlocked {
        bus.publish("badge", badge.id, "unlocked").await;
    }

    (
        StatusCode::OK,
        Json(RespondBody {
            success: true,
            response,
            points_awarded,
            badges_unlocked,
            is_first_responder: is_first,
        }),
    )
        .into_response()
}

/// Idempotent repeat respond: refresh the row, award nothing.
async fn refresh_response(
    db: &DatabaseConnection,
    bus: &EventBus,
    row: incident_helper::Model,
) -> Response {
    let mut active: incident_helper::ActiveModel = row.into();
    active.responded_at = Set(Utc::now().naive_utc());
    active.status = Set(incident_helper::STATUS_RESPONDING.to_string());

    match active.update(db).await {
        Ok(updated) => {
            bus.publish("helper_response", updated.id, "updated").await;
            (
                StatusCode::OK,
                Json(RespondBody {
                    success: true,
                    response: updated,
                    points_awarded: 0,
                    badges_unlocked: Vec::new(),
                    is_first_responder: false,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to refresh helper response: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update response")
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AwardSummary {
    user_id: i32,
    points: i32,
    reason: String,
}

// POST /incidents/:id/resolve
pub async fn resolve_incident(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(incident_id): Path<Uuid>,
) -> Response {
    let target = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Incident not found"),
        Err(e) => {
            error!("Failed to fetch incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let is_reporter = target.reporter_id == user_id;
    if !is_reporter {
        let helper = IncidentHelper::find()
            .filter(incident_helper::Column::IncidentId.eq(incident_id))
            .filter(incident_helper::Column::HelperId.eq(user_id))
            .one(&db)
            .await;
        match helper {
            Ok(Some(_)) => {}
            Ok(None) => {
                return failure(
                    StatusCode::FORBIDDEN,
                    "Not authorized to resolve this incident",
                )
            }
            Err(e) => {
                error!("Failed to check resolver authorization: {}", e);
                return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
            }
        }
    }

    // Conditional transition: only an active incident resolves, and only one
    // concurrent resolver wins.
    let transition = Incident::update_many()
        .col_expr(incident::Column::Status, Expr::value(incident::STATUS_RESOLVED))
        .col_expr(
            incident::Column::ResolvedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(incident::Column::Id.eq(incident_id))
        .filter(incident::Column::Status.eq(incident::STATUS_ACTIVE))
        .exec(&db)
        .await;
    match transition {
        Ok(result) if result.rows_affected == 1 => {}
        Ok(_) => return failure(StatusCode::CONFLICT, "Incident is no longer active"),
        Err(e) => {
            error!("Failed to resolve incident {}: {}", incident_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to resolve incident");
        }
    }

    tracing::Span::current()
        .record("action", "resolve_incident")
        .record("incident_id", tracing::field::display(incident_id))
        .record("user_id", user_id);
    domain_metrics::incident_closed(incident::STATUS_RESOLVED);

    // Helpers still engaged at resolution time earn the completion award.
    let mut awards = Vec::new();
    match IncidentHelper::find()
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .all(&db)
        .await
    {
        Ok(helpers) => {
            for helper in &helpers {
                if helper.status == incident_helper::STATUS_RESPONDING
                    || helper.status == incident_helper::STATUS_ARRIVED
                {
                    match ledger::award_points(
                        &db,
                        helper.helper_id,
                        ledger::POINTS_SOS_COMPLETED,
                        ledger::REASON_SOS_COMPLETED,
                    )
                    .await
                    {
                        Ok(_) => {
                            awards.push(AwardSummary {
                                user_id: helper.helper_id,
                                points: ledger::POINTS_SOS_COMPLETED,
                                reason: ledger::REASON_SOS_COMPLETED.to_string(),
                            });
                            if let Err(e) =
                                ledger::evaluate_badge_unlocks(&db, helper.helper_id).await
                            {
                                error!(
                                    "Badge evaluation failed for helper {}: {}",
                                    helper.helper_id, e
                                );
                            }
                        }
                        Err(e) => error!(
                            "Failed to award completion points to helper {}: {}",
                            helper.helper_id, e
                        ),
                    }
                }
            }

            let completed = IncidentHelper::update_many()
                .col_expr(
                    incident_helper::Column::Status,
                    Expr::value(incident_helper::STATUS_COMPLETED),
                )
                .filter(incident_helper::Column::IncidentId.eq(incident_id))
                .filter(incident_helper::Column::Status.ne(incident_helper::STATUS_COMPLETED))
                .exec(&db)
                .await;
            if let Err(e) = completed {
                error!("Failed to complete helper responses for {}: {}", incident_id, e);
            }
        }
        Err(e) => error!("Failed to fetch helpers for incident {}: {}", incident_id, e),
    }

    if is_reporter {
        match ledger::award_points(
            &db,
            user_id,
            ledger::POINTS_INCIDENT_RESOLVED,
            ledger::REASON_INCIDENT_RESOLVED,
        )
        .await
        {
            Ok(_) => awards.push(AwardSummary {
                user_id,
                points: ledger::POINTS_INCIDENT_RESOLVED,
                reason: ledger::REASON_INCIDENT_RESOLVED.to_string(),
            }),
            Err(e) => error!("Failed to award resolve bonus to reporter {}: {}", user_id, e),
        }
    }

    bus.publish("incident", incident_id, "resolved").await;

    let resolved = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        _ => {
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reload incident")
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "incident": resolved,
            "pointsAwards": awards,
        })),
    )
        .into_response()
}

// POST /incidents/:id/cancel
pub async fn cancel_incident(
    Extension(db): Extension<DatabaseConnection>,
    Extension(bus): Extension<EventBus>,
    Extension(user_id): Extension<i32>,
    Path(incident_id): Path<Uuid>,
) -> Response {
    let target = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Incident not found"),
        Err(e) => {
            error!("Failed to fetch incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    if target.reporter_id != user_id {
        return failure(
            StatusCode::FORBIDDEN,
            "Only the reporter can cancel an incident",
        );
    }

    let transition = Incident::update_many()
        .col_expr(incident::Column::Status, Expr::value(incident::STATUS_CANCELLED))
        .col_expr(
            incident::Column::ResolvedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(incident::Column::Id.eq(incident_id))
        .filter(incident::Column::Status.eq(incident::STATUS_ACTIVE))
        .exec(&db)
        .await;
    match transition {
        Ok(result) if result.rows_affected == 1 => {}
        Ok(_) => return failure(StatusCode::CONFLICT, "Incident is no longer active"),
        Err(e) => {
            error!("Failed to cancel incident {}: {}", incident_id, e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to cancel incident");
        }
    }

    domain_metrics::incident_closed(incident::STATUS_CANCELLED);

    // Cancellation closes out helper responses without completion awards.
    let completed = IncidentHelper::update_many()
        .col_expr(
            incident_helper::Column::Status,
            Expr::value(incident_helper::STATUS_COMPLETED),
        )
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .filter(incident_helper::Column::Status.ne(incident_helper::STATUS_COMPLETED))
        .exec(&db)
        .await;
    if let Err(e) = completed {
        error!("Failed to complete helper responses for {}: {}", incident_id, e);
    }

    bus.publish("incident", incident_id, "cancelled").await;

    match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => (
            StatusCode::OK,
            Json(json!({"success": true, "incident": model})),
        )
            .into_response(),
        _ => failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to reload incident"),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHelperRequest {
    pub rating: i32,
    pub actions_taken: Option<serde_json::Value>,
    pub thank_you_note: Option<String>,
}

// POST /incidents/:id/helpers/:helper_id/rate
pub async fn rate_helper(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Path((incident_id, helper_id)): Path<(Uuid, i32)>,
    Json(payload): Json<RateHelperRequest>,
) -> Response {
    if !(1..=5).contains(&payload.rating) {
        return failure(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5");
    }

    let target = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Incident not found"),
        Err(e) => {
            error!("Failed to fetch incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    if target.reporter_id != user_id {
        return failure(StatusCode::FORBIDDEN, "Only the reporter can rate helpers");
    }
    if target.status != incident::STATUS_RESOLVED {
        return failure(
            StatusCode::CONFLICT,
            "Incident must be resolved before rating helpers",
        );
    }

    let helper = match IncidentHelper::find()
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .filter(incident_helper::Column::HelperId.eq(helper_id))
        .one(&db)
        .await
    {
        Ok(Some(row)) => row,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Helper response not found"),
        Err(e) => {
            error!("Failed to fetch helper response: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let mut active: incident_helper::ActiveModel = helper.into();
    active.rating = Set(Some(payload.rating));
    active.actions_taken = Set(payload.actions_taken);
    active.thank_you_note = Set(payload.thank_you_note);

    match active.update(&db).await {
        Ok(updated) => (
            StatusCode::OK,
            Json(json!({"success": true, "response": updated})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to save helper rating: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save rating")
        }
    }
}

// GET /incidents/:id
pub async fn get_incident(
    Extension(db): Extension<DatabaseConnection>,
    Path(incident_id): Path<Uuid>,
) -> Response {
    let target = match Incident::find_by_id(incident_id).one(&db).await {
        Ok(Some(model)) => model,
        Ok(None) => return failure(StatusCode::NOT_FOUND, "Incident not found"),
        Err(e) => {
            error!("Failed to fetch incident: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let helpers = match IncidentHelper::find()
        .filter(incident_helper::Column::IncidentId.eq(incident_id))
        .order_by_asc(incident_helper::Column::RespondedAt)
        .order_by_asc(incident_helper::Column::Id)
        .all(&db)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch helper responses: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    (
        StatusCode::OK,
        Json(json!({"success": true, "incident": target, "helpers": helpers})),
    )
        .into_response()
}

// GET /incidents/active
pub async fn list_active_incidents(Extension(db): Extension<DatabaseConnection>) -> Response {
    match Incident::find()
        .filter(incident::Column::Status.eq(incident::STATUS_ACTIVE))
        .order_by_desc(incident::Column::CreatedAt)
        .all(&db)
        .await
    {
        Ok(incidents) => (
            StatusCode::OK,
            Json(json!({"success": true, "incidents": incidents})),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to list active incidents: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch incidents")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn response_row(id: i32, helper_id: i32, responded_at: &str) -> incident_helper::Model {
        incident_helper::Model {
            id,
            incident_id: Uuid::nil(),
            helper_id,
            status: incident_helper::STATUS_RESPONDING.to_string(),
            responded_at: NaiveDateTime::parse_from_str(responded_at, "%Y-%m-%d %H:%M:%S")
                .unwrap(),
            arrived_at: None,
            rating: None,
            actions_taken: None,
            thank_you_note: None,
        }
    }

    #[test]
    fn earliest_responded_at_wins() {
        let rows = vec![
            response_row(2, 20, "2026-08-01 12:00:05"),
            response_row(1, 10, "2026-08-01 12:00:01"),
        ];
        assert_eq!(first_responder_id(&rows), Some(10));
    }

    #[test]
    fn wall_clock_ties_break_by_insertion_order() {
        let rows = vec![
            response_row(7, 70, "2026-08-01 12:00:01"),
            response_row(3, 30, "2026-08-01 12:00:01"),
        ];
        assert_eq!(first_responder_id(&rows), Some(30));
    }

    #[test]
    fn no_responses_means_no_first_responder() {
        assert_eq!(first_responder_id(&[]), None);
    }

    #[test]
    fn coordinate_validation_bounds() {
        assert!(valid_coordinates(34.07, -118.45));
        assert!(!valid_coordinates(91.0, 0.0));
        assert!(!valid_coordinates(0.0, -181.0));
        assert!(!valid_coordinates(f64::NAN, 0.0));
    }
}

#[cfg(all(test, feature = "mock"))]
mod mock_tests {
    use super::*;
    use crate::entities::{badge, point_award, user, user_badge};
    use crate::events::EventBus;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn test_bus() -> EventBus {
        EventBus::new(redis::Client::open("redis://127.0.0.1:6399").unwrap())
    }

    fn active_incident(id: Uuid, reporter_id: i32) -> incident::Model {
        incident::Model {
            id,
            reporter_id,
            kind: incident::KIND_SOS.to_string(),
            emergency_type: None,
            status: incident::STATUS_ACTIVE.to_string(),
            latitude: Some(34.07),
            longitude: Some(-118.45),
            description: None,
            voice_note_url: None,
            is_silent: false,
            auto_contact: false,
            created_at: Utc::now().naive_utc(),
            resolved_at: None,
        }
    }

    fn helper_row(id: i32, incident_id: Uuid, helper_id: i32) -> incident_helper::Model {
        incident_helper::Model {
            id,
            incident_id,
            helper_id,
            status: incident_helper::STATUS_RESPONDING.to_string(),
            responded_at: Utc::now().naive_utc(),
            arrived_at: None,
            rating: None,
            actions_taken: None,
            thank_you_note: None,
        }
    }

    fn points_row(points: i32, level: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("points", Value::from(points)), ("level", Value::from(level))])
    }

    fn user_row(id: i32, points: i32) -> user::Model {
        user::Model {
            id,
            email: format!("u{}@campus.edu", id),
            password_hash: "x".to_string(),
            name: "Helper".to_string(),
            phone: None,
            points,
            level: points / 500,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn classification_failure_awards_backup_bonus() {
        let incident_id = Uuid::new_v4();
        // The response row lands but the ordering read fails; the caller
        // must get the backup award, never the first-responder bonus.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active_incident(incident_id, 99)]])
            .append_query_results([Vec::<incident_helper::Model>::new()])
            .append_query_results([vec![helper_row(1, incident_id, 7)]])
            .append_query_errors([DbErr::Custom("classification read failed".to_string())])
            .append_query_results([vec![points_row(100, 0)]])
            .append_query_results([vec![point_award::Model {
                id: 1,
                user_id: 7,
                points: ledger::POINTS_SOS_RESPONSE,
                reason: ledger::REASON_SOS_RESPONSE.to_string(),
                created_at: Utc::now().naive_utc(),
            }]])
            .append_query_results([vec![user_row(7, 100)]])
            .append_query_results([Vec::<user_badge::Model>::new()])
            .append_query_results([Vec::<badge::Model>::new()])
            .into_connection();

        let response = respond_to_incident(
            Extension(db),
            Extension(test_bus()),
            Extension(7),
            Path(incident_id),
            Json(RespondRequest::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["isFirstResponder"], serde_json::json!(false));
        assert_eq!(body["pointsAwarded"], serde_json::json!(ledger::POINTS_SOS_RESPONSE));
    }

    #[tokio::test]
    async fn respond_conflicts_when_incident_resolves_mid_flight() {
        let incident_id = Uuid::new_v4();
        // The incident resolves between the status check and the write; the
        // conditional insert matches no row and nothing is recorded.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active_incident(incident_id, 99)]])
            .append_query_results([Vec::<incident_helper::Model>::new()])
            .append_query_results([Vec::<incident_helper::Model>::new()])
            .into_connection();

        let response = respond_to_incident(
            Extension(db),
            Extension(test_bus()),
            Extension(7),
            Path(incident_id),
            Json(RespondRequest::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn resolve_rejects_non_participants() {
        let incident_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active_incident(incident_id, 1)]])
            .append_query_results([Vec::<incident_helper::Model>::new()])
            .into_connection();

        let response = resolve_incident(
            Extension(db),
            Extension(test_bus()),
            Extension(2),
            Path(incident_id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
