use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::enums::payment_providers::PaymentProvider;

#[async_trait]
#[automock]
pub trait ProcessedEventRepository {
    async fn seen(
        &self,
        subscriber_id: Uuid,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<bool>;

    /// Insert is conflict-tolerant: recording an already-known id is a no-op.
    async fn record(
        &self,
        subscriber_id: Uuid,
        provider: PaymentProvider,
        event_id: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<()>;
}
