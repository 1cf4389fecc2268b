use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{check_in_timer, incident, user};

/// Seed gauges from current table counts so dashboards read sensibly after
/// a restart.
pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = user::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("safecircle_users_total").set(user_count as f64);

    let active_incidents = incident::Entity::find()
        .filter(incident::Column::Status.eq(incident::STATUS_ACTIVE))
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("safecircle_incidents_active").set(active_incidents as f64);

    let active_timers = check_in_timer::Entity::find()
        .filter(check_in_timer::Column::Status.eq(check_in_timer::STATUS_ACTIVE))
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("safecircle_timers_active").set(active_timers as f64);

    tracing::info!(
        "Initialized metrics: Users={}, ActiveIncidents={}, ActiveTimers={}",
        user_count,
        active_incidents,
        active_timers
    );
}

pub fn incident_opened(kind: &str) {
    metrics::counter!("safecircle_incidents_created_total", "kind" => kind.to_string())
        .increment(1);
    metrics::gauge!("safecircle_incidents_active").increment(1.0);
}

pub fn incident_closed(status: &str) {
    metrics::counter!("safecircle_incidents_closed_total", "status" => status.to_string())
        .increment(1);
    metrics::gauge!("safecircle_incidents_active").decrement(1.0);
}

pub fn helper_responded(first_responder: bool) {
    let class = if first_responder { "first" } else { "backup" };
    metrics::counter!("safecircle_helper_responses_total", "class" => class).increment(1);
}
