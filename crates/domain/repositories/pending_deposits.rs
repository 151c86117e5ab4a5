use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::pending_deposits::{InsertPendingDepositEntity, PendingDepositEntity},
    value_objects::enums::deposit_statuses::DepositStatus,
};

#[async_trait]
#[automock]
pub trait PendingDepositRepository {
    async fn create(&self, entity: InsertPendingDepositEntity) -> Result<Uuid>;

    /// Latest unreviewed deposit for the subscriber, if any.
    async fn find_pending_for_subscriber(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Option<PendingDepositEntity>>;

    async fn mark_reviewed(
        &self,
        deposit_id: Uuid,
        status: DepositStatus,
        transaction_hash: Option<&str>,
        admin_notes: Option<&str>,
        reviewed_by: &str,
    ) -> Result<()>;
}
