use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::scheduled_messages::ScheduledMessageEntity,
    value_objects::enums::delivery_outcomes::DeliveryOutcome,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledMessageModel {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub body: String,
    pub image_url: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_outcome: DeliveryOutcome,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ScheduledMessageEntity> for ScheduledMessageModel {
    fn from(entity: ScheduledMessageEntity) -> Self {
        ScheduledMessageModel {
            id: entity.id,
            subscriber_id: entity.subscriber_id,
            body: entity.body,
            image_url: entity.image_url,
            scheduled_for: entity.scheduled_for,
            sent: entity.sent,
            sent_at: entity.sent_at,
            delivery_outcome: DeliveryOutcome::from_str(&entity.delivery_outcome),
            attempts: entity.attempts,
            created_at: entity.created_at,
        }
    }
}

/// One-off admin enqueue, bypassing the group calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueMessageModel {
    pub body: String,
    pub image_url: Option<String>,
    pub scheduled_for: DateTime<Utc>,
}
