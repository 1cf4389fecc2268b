use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{check_in_timer, incident, prelude::*};
use crate::events::EventBus;
use crate::notify;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRecord {
    pub timer_id: Uuid,
    pub user_id: i32,
    pub incident_id: Uuid,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub expired_count: u64,
    pub alerts_created: u64,
    pub results: Vec<EscalationRecord>,
}

/// Expire overdue check-in timers and escalate each into a silent incident.
///
/// Safe to invoke repeatedly or concurrently: each timer is claimed with a
/// conditional active -> expired update, and only the caller whose update
/// hits a row escalates it.
pub async fn run_sweep(db: &DatabaseConnection, bus: &EventBus) -> Result<SweepOutcome, DbErr> {
    let now = Utc::now().naive_utc();
    let due = CheckInTimer::find()
        .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
        .filter(check_in_timer::Column::ExpiresAt.lt(now))
        .all(db)
        .await?;

    let mut outcome = SweepOutcome::default();
    for timer in due {
        let claimed = CheckInTimer::update_many()
            .col_expr(
                check_in_timer::Column::Status,
                Expr::value(check_in_timer::STATUS_EXPIRED),
            )
            .filter(check_in_timer::Column::Id.eq(timer.id))
            .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
            .exec(db)
            .await?;
        if claimed.rows_affected == 0 {
            // Checked in, superseded, or claimed by an overlapping sweep.
            continue;
        }

        outcome.expired_count += 1;
        metrics::counter!("safecircle_timers_expired_total").increment(1);
        bus.publish("check_in_timer", timer.id, "expired").await;

        // The location requirement is relaxed for this internal caller: a
        // user who went dark may have no last known position at all.
        let location = UserLocation::find_by_id(timer.user_id).one(db).await?;
        let (latitude, longitude) = match &location {
            Some(loc) => (Some(loc.latitude), Some(loc.longitude)),
            None => {
                tracing::warn!(
                    user_id = timer.user_id,
                    timer_id = %timer.id,
                    "escalating expired timer without a known location"
                );
                (None, None)
            }
        };

        let escalated = incident::ActiveModel {
            id: Set(Uuid::new_v4()),
            reporter_id: Set(timer.user_id),
            kind: Set(incident::KIND_SILENT.to_string()),
            emergency_type: Set(None),
            status: Set(incident::STATUS_ACTIVE.to_string()),
            latitude: Set(latitude),
            longitude: Set(longitude),
            description: Set(Some(
                "Check-in timer expired without check-in".to_string(),
            )),
            voice_note_url: Set(None),
            is_silent: Set(true),
            auto_contact: Set(false),
            created_at: Set(Utc::now().naive_utc()),
            resolved_at: Set(None),
        };

        let created = match escalated.insert(db).await {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(timer_id = %timer.id, "failed to escalate expired timer: {}", e);
                continue;
            }
        };

        metrics::counter!("safecircle_incidents_created_total", "kind" => incident::KIND_SILENT)
            .increment(1);
        bus.publish("incident", created.id, "created").await;

        if let Err(e) = notify::fan_out_trusted_circle(db, created.id, timer.user_id).await {
            tracing::error!(
                incident_id = %created.id,
                "trusted-circle fan-out failed for escalated incident: {}",
                e
            );
        }

        tracing::info!(
            timer_id = %timer.id,
            user_id = timer.user_id,
            incident_id = %created.id,
            "expired check-in timer escalated to silent incident"
        );

        outcome.alerts_created += 1;
        outcome.results.push(EscalationRecord {
            timer_id: timer.id,
            user_id: timer.user_id,
            incident_id: created.id,
        });
    }

    Ok(outcome)
}

#[cfg(all(test, feature = "mock"))]
mod mock_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn timer_claimed_elsewhere_is_not_escalated() {
        let started = Utc::now().naive_utc() - chrono::Duration::minutes(60);
        let timer = check_in_timer::Model {
            id: Uuid::new_v4(),
            user_id: 7,
            duration_minutes: 30,
            started_at: started,
            expires_at: started + chrono::Duration::minutes(30),
            status: check_in_timer::STATUS_ACTIVE.to_string(),
            created_at: started,
        };
        // The claim hits no row (checked in, superseded, or taken by an
        // overlapping sweep) and no incident is raised.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![timer]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let bus = EventBus::new(redis::Client::open("redis://127.0.0.1:6399").unwrap());

        let outcome = run_sweep(&db, &bus).await.unwrap();
        assert_eq!(outcome.expired_count, 0);
        assert_eq!(outcome.alerts_created, 0);
        assert!(outcome.results.is_empty());
    }
}
