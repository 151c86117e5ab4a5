use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::pending_deposits::PendingDepositEntity,
    value_objects::enums::deposit_statuses::DepositStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingDepositModel {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub currency: String,
    pub amount_minor: i32,
    pub wallet_address: String,
    pub transaction_hash: Option<String>,
    pub status: DepositStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl From<PendingDepositEntity> for PendingDepositModel {
    fn from(entity: PendingDepositEntity) -> Self {
        PendingDepositModel {
            id: entity.id,
            subscriber_id: entity.subscriber_id,
            currency: entity.currency,
            amount_minor: entity.amount_minor,
            wallet_address: entity.wallet_address,
            transaction_hash: entity.transaction_hash,
            status: DepositStatus::from_str(&entity.status),
            created_at: entity.created_at,
            reviewed_at: entity.reviewed_at,
        }
    }
}

/// Subscriber-announced manual wallet transfer, awaiting admin review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDepositModel {
    pub currency: String,
    pub amount_minor: i32,
    pub wallet_address: String,
    pub transaction_hash: Option<String>,
}
