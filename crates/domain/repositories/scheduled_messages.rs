use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::scheduled_messages::{InsertScheduledMessageEntity, ScheduledMessageEntity},
    value_objects::enums::delivery_outcomes::DeliveryOutcome,
};

#[async_trait]
#[automock]
pub trait ScheduledMessageRepository {
    async fn enqueue(&self, entity: InsertScheduledMessageEntity) -> Result<Uuid>;

    async fn enqueue_batch(&self, entities: Vec<InsertScheduledMessageEntity>) -> Result<usize>;

    /// Unsent, still-pending records due at or before `as_of` (including the
    /// retry-backoff gate), earliest target instant first.
    async fn due_messages(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledMessageEntity>>;

    /// Idempotent terminal transition; the sent flag is never reverted.
    /// Returns whether this call performed the transition.
    async fn mark_sent(
        &self,
        message_id: Uuid,
        sent_at: DateTime<Utc>,
        outcome: DeliveryOutcome,
    ) -> Result<bool>;

    /// Bumps the attempt counter and schedules the next retry.
    /// Returns the new attempt count.
    async fn record_failure(
        &self,
        message_id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<i32>;

    async fn mark_failed(&self, message_id: Uuid, error: &str) -> Result<()>;

    async fn list_for_subscriber(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Vec<ScheduledMessageEntity>>;

    /// (pending, sent) counts for reporting surfaces.
    async fn message_counts(&self) -> Result<(i64, i64)>;
}
