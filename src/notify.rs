use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::{incident_notification, trusted_circle, prelude::*};

/// Record one notification per accepted trusted-circle contact of the
/// reporter. Returns how many contacts were notified.
pub async fn fan_out_trusted_circle(
    db: &DatabaseConnection,
    incident_id: Uuid,
    reporter_id: i32,
) -> Result<u64, DbErr> {
    let contacts = TrustedCircle::find()
        .filter(trusted_circle::Column::UserId.eq(reporter_id))
        .filter(trusted_circle::Column::Status.eq(trusted_circle::STATUS_ACCEPTED))
        .all(db)
        .await?;

    let now = Utc::now().naive_utc();
    for contact in &contacts {
        incident_notification::ActiveModel {
            incident_id: Set(incident_id),
            user_id: Set(contact.trusted_user_id),
            kind: Set(incident_notification::KIND_TRUSTED_CIRCLE.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    metrics::counter!("safecircle_notifications_recorded_total", "kind" => "trusted_circle")
        .increment(contacts.len() as u64);
    Ok(contacts.len() as u64)
}

/// Attach nearby sharing users as notification targets. They become helpers
/// only if they actively respond.
pub async fn record_nearby_helpers(
    db: &DatabaseConnection,
    incident_id: Uuid,
    helper_ids: &[i32],
) -> Result<u64, DbErr> {
    let now = Utc::now().naive_utc();
    for helper_id in helper_ids {
        incident_notification::ActiveModel {
            incident_id: Set(incident_id),
            user_id: Set(*helper_id),
            kind: Set(incident_notification::KIND_NEARBY_HELPER.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    metrics::counter!("safecircle_notifications_recorded_total", "kind" => "nearby_helper")
        .increment(helper_ids.len() as u64);
    Ok(helper_ids.len() as u64)
}

/// Record the intent to auto-contact emergency services. No telephony
/// happens here; an external collaborator consumes the change event.
pub async fn record_emergency_services_contact(
    db: &DatabaseConnection,
    incident_id: Uuid,
    reporter_id: i32,
) -> Result<(), DbErr> {
    incident_notification::ActiveModel {
        incident_id: Set(incident_id),
        user_id: Set(reporter_id),
        kind: Set(incident_notification::KIND_EMERGENCY_SERVICES.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    metrics::counter!("safecircle_notifications_recorded_total", "kind" => "emergency_services")
        .increment(1);
    Ok(())
}
