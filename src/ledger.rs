use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, Set, Statement, TransactionTrait,
};
use serde::Serialize;

use crate::entities::{badge, point_award, user_badge, prelude::*};

pub const POINTS_PER_LEVEL: i32 = 500;

pub const POINTS_FIRST_RESPONDER: i32 = 150;
pub const POINTS_SOS_RESPONSE: i32 = 100;
pub const POINTS_SOS_COMPLETED: i32 = 100;
pub const POINTS_CHECK_IN: i32 = 10;
pub const POINTS_INCIDENT_RESOLVED: i32 = 10;
pub const POINTS_TRUSTED_CIRCLE_ACCEPT: i32 = 15;

pub const REASON_FIRST_RESPONDER: &str = "first_responder";
pub const REASON_SOS_RESPONSE: &str = "sos_response";
pub const REASON_SOS_COMPLETED: &str = "sos_completed";
pub const REASON_CHECK_IN: &str = "check_in_timer_used";
pub const REASON_INCIDENT_RESOLVED: &str = "incident_resolved";
pub const REASON_TRUSTED_CIRCLE_ACCEPT: &str = "added_to_trusted_circle";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsResult {
    pub points: i32,
    pub level: i32,
    pub leveled_up: bool,
}

pub fn level_for(points: i32) -> i32 {
    points / POINTS_PER_LEVEL
}

#[derive(FromQueryResult)]
struct PointsRow {
    points: i32,
    level: i32,
}

/// Atomically add `amount` to the user's running total and recompute the
/// level in the same statement, so concurrent awards never lose an update.
/// The update and the history row commit together: a failed history insert
/// rolls the total back rather than leaving unexplained points.
pub async fn award_points(
    db: &DatabaseConnection,
    user_id: i32,
    amount: i32,
    reason: &str,
) -> Result<PointsResult, DbErr> {
    if amount <= 0 {
        return Err(DbErr::Custom("points amount must be positive".to_string()));
    }

    let txn = db.begin().await?;

    let row = PointsRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "UPDATE users SET points = points + $1, level = (points + $1) / $2, updated_at = $3 \
         WHERE id = $4 RETURNING points, level",
        [
            amount.into(),
            POINTS_PER_LEVEL.into(),
            Utc::now().naive_utc().into(),
            user_id.into(),
        ],
    ))
    .one(&txn)
    .await?
    .ok_or_else(|| DbErr::RecordNotFound(format!("user {} not found", user_id)))?;

    let leveled_up = level_for(row.points - amount) < row.level;

    point_award::ActiveModel {
        user_id: Set(user_id),
        points: Set(amount),
        reason: Set(reason.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    metrics::counter!("safecircle_points_awarded_total", "reason" => reason.to_string())
        .increment(amount as u64);
    if leveled_up {
        tracing::info!(user_id, level = row.level, "user leveled up");
    }

    Ok(PointsResult {
        points: row.points,
        level: row.level,
        leveled_up,
    })
}

/// Badges whose threshold is met and which the user does not hold yet.
pub fn newly_unlockable(
    catalog: &[badge::Model],
    unlocked: &[i32],
    points: i32,
) -> Vec<badge::Model> {
    catalog
        .iter()
        .filter(|b| b.points_required <= points && !unlocked.contains(&b.id))
        .cloned()
        .collect()
}

/// Unlock every catalog badge the user's current point total now covers.
/// Idempotent: already-held badges are skipped via the unique (user, badge)
/// constraint, so re-evaluation without a points change unlocks nothing.
pub async fn evaluate_badge_unlocks(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<badge::Model>, DbErr> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("user {} not found", user_id)))?;

    let held: Vec<i32> = UserBadge::find()
        .filter(user_badge::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|ub| ub.badge_id)
        .collect();

    let catalog = Badge::find().all(db).await?;
    let candidates = newly_unlockable(&catalog, &held, user.points);

    let mut unlocked = Vec::new();
    for badge in candidates {
        let insert = UserBadge::insert(user_badge::ActiveModel {
            user_id: Set(user_id),
            badge_id: Set(badge.id),
            unlocked_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([user_badge::Column::UserId, user_badge::Column::BadgeId])
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await;

        match insert {
            Ok(_) => {
                tracing::info!(user_id, badge = %badge.name, "badge unlocked");
                metrics::counter!("safecircle_badges_unlocked_total", "tier" => badge.tier.clone())
                    .increment(1);
                unlocked.push(badge);
            }
            // A concurrent evaluation got there first.
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(id: i32, tier: &str, points_required: i32) -> badge::Model {
        badge::Model {
            id,
            name: format!("badge-{}", id),
            icon: "⭐".to_string(),
            description: None,
            tier: tier.to_string(),
            points_required,
        }
    }

    #[test]
    fn level_is_floor_of_500_point_tiers() {
        assert_eq!(level_for(0), 0);
        assert_eq!(level_for(499), 0);
        assert_eq!(level_for(500), 1);
        assert_eq!(level_for(1249), 2);
        assert_eq!(level_for(10_000), 20);
    }

    #[test]
    fn unlockable_respects_thresholds() {
        let catalog = vec![badge(1, "bronze", 100), badge(2, "silver", 500)];
        let names: Vec<i32> = newly_unlockable(&catalog, &[], 250)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(names, vec![1]);
    }

    #[test]
    fn unlockable_skips_already_held_badges() {
        let catalog = vec![badge(1, "bronze", 100), badge(2, "silver", 500)];
        let again = newly_unlockable(&catalog, &[1, 2], 9_999);
        assert!(again.is_empty());
    }
}

#[cfg(all(test, feature = "mock"))]
mod mock_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn points_row(points: i32, level: i32) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("points", Value::from(points)), ("level", Value::from(level))])
    }

    #[tokio::test]
    async fn award_reports_new_total_and_level_up() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![points_row(510, 1)]])
            .append_query_results([vec![point_award::Model {
                id: 1,
                user_id: 7,
                points: 20,
                reason: REASON_SOS_RESPONSE.to_string(),
                created_at: Utc::now().naive_utc(),
            }]])
            .into_connection();

        let result = award_points(&db, 7, 20, REASON_SOS_RESPONSE).await.unwrap();
        assert_eq!(result.points, 510);
        assert_eq!(result.level, 1);
        assert!(result.leveled_up);
    }

    #[tokio::test]
    async fn failed_history_insert_surfaces_error() {
        // The update and the history row share a transaction; a failed
        // insert rolls back and is reported instead of leaving unexplained
        // points on the account.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![points_row(110, 0)]])
            .append_query_errors([DbErr::Custom("history insert failed".to_string())])
            .into_connection();

        assert!(award_points(&db, 7, 10, REASON_CHECK_IN).await.is_err());
    }
}
