use redis::AsyncCommands;
use serde::Serialize;
use tracing::{debug, error};

/// Channel downstream realtime subscribers (chat, map, dashboards) listen on.
pub const EVENT_CHANNEL: &str = "safecircle:events";

#[derive(Debug, Serialize)]
pub struct ChangeEvent<'a> {
    pub entity: &'a str,
    pub id: String,
    pub action: &'a str,
}

/// Change-event bus over Redis pub/sub. Publishing is best-effort by
/// contract: failures are logged and never surfaced to the caller, since
/// the persisted record is the safety-critical artifact.
#[derive(Clone)]
pub struct EventBus {
    client: redis::Client,
}

impl EventBus {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub async fn publish(&self, entity: &str, id: impl ToString, action: &str) {
        let event = ChangeEvent {
            entity,
            id: id.to_string(),
            action,
        };

        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize change event: {}", e);
                return;
            }
        };

        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Event bus: failed to get redis conn: {}", e);
                metrics::counter!("safecircle_events_failed_total").increment(1);
                return;
            }
        };

        let result: redis::RedisResult<i64> = conn.publish(EVENT_CHANNEL, payload).await;
        match result {
            Ok(receivers) => {
                debug!(entity, action, receivers, "published change event");
                metrics::counter!("safecircle_events_published_total", "entity" => entity.to_string())
                    .increment(1);
            }
            Err(e) => {
                error!("Failed to publish change event: {}", e);
                metrics::counter!("safecircle_events_failed_total").increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_event_wire_shape() {
        let event = ChangeEvent {
            entity: "incident",
            id: "42".to_string(),
            action: "resolved",
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"entity": "incident", "id": "42", "action": "resolved"})
        );
    }
}
