use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscribers::{InsertSubscriberEntity, SubscriberEntity},
    value_objects::{
        enums::{
            payment_providers::PaymentProvider, subscription_statuses::SubscriptionStatus,
        },
        provider_bindings::ProviderBinding,
    },
};

#[async_trait]
#[automock]
pub trait SubscriberRepository {
    async fn create(&self, insert_subscriber_entity: InsertSubscriberEntity) -> Result<Uuid>;

    async fn find_by_id(&self, subscriber_id: Uuid) -> Result<Option<SubscriberEntity>>;

    async fn find_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_ref: &str,
    ) -> Result<Option<SubscriberEntity>>;

    /// Dispatch-time status re-check; the read path of the state machine.
    async fn current_status(&self, subscriber_id: Uuid) -> Result<Option<SubscriptionStatus>>;

    /// Conditional status update: succeeds only while the stored status still
    /// equals `expected`, so racing writers cannot interleave a lost update.
    /// Records the provider binding alongside the transition when supplied.
    async fn transition_status(
        &self,
        subscriber_id: Uuid,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        binding: Option<ProviderBinding>,
    ) -> Result<bool>;

    async fn list_active_in_group(&self, group_id: Uuid) -> Result<Vec<SubscriberEntity>>;

    async fn status_counts(&self) -> Result<Vec<(String, i64)>>;

    /// Admin purge: hard-deletes the subscriber and cascades to their
    /// scheduled messages and pending deposits.
    async fn purge(&self, subscriber_id: Uuid) -> Result<()>;
}
