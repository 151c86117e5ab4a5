use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscribers::SubscriberEntity,
    value_objects::{
        enums::{
            delivery_preferences::DeliveryPreference, subscription_statuses::SubscriptionStatus,
        },
        provider_bindings::ProviderBinding,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriberModel {
    pub id: Uuid,
    pub phone_number: String,
    pub carrier: String,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
    pub delivery_preference: DeliveryPreference,
    pub status: SubscriptionStatus,
    pub binding: ProviderBinding,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriberEntity> for SubscriberModel {
    fn from(entity: SubscriberEntity) -> Self {
        let binding = ProviderBinding::from_columns(
            entity.payment_provider.as_deref(),
            entity.provider_ref.as_deref(),
        );
        SubscriberModel {
            id: entity.id,
            phone_number: entity.phone_number,
            carrier: entity.carrier,
            timezone_offset_minutes: entity.timezone_offset_minutes,
            timezone_label: entity.timezone_label,
            delivery_preference: DeliveryPreference::from_str(&entity.delivery_preference)
                .unwrap_or_default(),
            status: SubscriptionStatus::from_str(&entity.status),
            binding,
            group_id: entity.group_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Onboarding contract: phone + carrier are immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriberModel {
    pub phone_number: String,
    pub carrier: String,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
    pub delivery_preference: String,
    pub group_id: Option<Uuid>,
}
