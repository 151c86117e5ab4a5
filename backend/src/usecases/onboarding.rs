use std::sync::Arc;

use textline::domain::{
    entities::{
        pending_deposits::InsertPendingDepositEntity,
        scheduled_messages::InsertScheduledMessageEntity, subscribers::InsertSubscriberEntity,
    },
    repositories::{
        pending_deposits::PendingDepositRepository,
        scheduled_messages::ScheduledMessageRepository, subscribers::SubscriberRepository,
    },
    value_objects::{
        enums::{
            delivery_outcomes::DeliveryOutcome, delivery_preferences::DeliveryPreference,
            deposit_statuses::DepositStatus, subscription_statuses::SubscriptionStatus,
        },
        pending_deposits::RegisterDepositModel,
        scheduled_messages::{EnqueueMessageModel, ScheduledMessageModel},
        subscribers::{CreateSubscriberModel, SubscriberModel},
    },
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("invalid delivery preference: {0}")]
    InvalidPreference(String),
    #[error("subscriber not found")]
    SubscriberNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OnboardingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OnboardingError::InvalidPreference(_) => StatusCode::BAD_REQUEST,
            OnboardingError::SubscriberNotFound => StatusCode::NOT_FOUND,
            OnboardingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Contracts consumed by the onboarding flow and admin surfaces: subscriber
/// creation, status/message queries, one-off enqueueing, deposit
/// registration and purge. Status transitions stay out of here entirely.
pub struct OnboardingUseCase<S, M, D>
where
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
    D: PendingDepositRepository + Send + Sync + 'static,
{
    subscriber_repo: Arc<S>,
    message_repo: Arc<M>,
    deposit_repo: Arc<D>,
}

impl<S, M, D> OnboardingUseCase<S, M, D>
where
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
    D: PendingDepositRepository + Send + Sync + 'static,
{
    pub fn new(subscriber_repo: Arc<S>, message_repo: Arc<M>, deposit_repo: Arc<D>) -> Self {
        Self {
            subscriber_repo,
            message_repo,
            deposit_repo,
        }
    }

    pub async fn create_subscriber(
        &self,
        model: CreateSubscriberModel,
    ) -> Result<Uuid, OnboardingError> {
        let preference = DeliveryPreference::from_str(&model.delivery_preference)
            .ok_or_else(|| OnboardingError::InvalidPreference(model.delivery_preference.clone()))?;

        let entity = InsertSubscriberEntity {
            phone_number: model.phone_number,
            carrier: model.carrier,
            timezone_offset_minutes: model.timezone_offset_minutes,
            timezone_label: model.timezone_label,
            delivery_preference: preference.as_str().to_string(),
            status: SubscriptionStatus::Pending.as_str().to_string(),
            payment_provider: None,
            provider_ref: None,
            group_id: model.group_id,
        };

        let subscriber_id = self.subscriber_repo.create(entity).await.map_err(|err| {
            error!(db_error = ?err, "onboarding: failed to create subscriber");
            OnboardingError::Internal(err)
        })?;

        info!(%subscriber_id, "onboarding: subscriber created in pending state");
        Ok(subscriber_id)
    }

    pub async fn subscriber_status(
        &self,
        subscriber_id: Uuid,
    ) -> Result<SubscriberModel, OnboardingError> {
        let subscriber = self
            .subscriber_repo
            .find_by_id(subscriber_id)
            .await?
            .ok_or(OnboardingError::SubscriberNotFound)?;

        Ok(SubscriberModel::from(subscriber))
    }

    pub async fn list_messages(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Vec<ScheduledMessageModel>, OnboardingError> {
        self.subscriber_repo
            .find_by_id(subscriber_id)
            .await?
            .ok_or(OnboardingError::SubscriberNotFound)?;

        let messages = self.message_repo.list_for_subscriber(subscriber_id).await?;
        Ok(messages.into_iter().map(ScheduledMessageModel::from).collect())
    }

    /// One-off admin message, bypassing the group calculator.
    pub async fn enqueue_one_off(
        &self,
        subscriber_id: Uuid,
        model: EnqueueMessageModel,
    ) -> Result<Uuid, OnboardingError> {
        let subscriber = self
            .subscriber_repo
            .find_by_id(subscriber_id)
            .await?
            .ok_or(OnboardingError::SubscriberNotFound)?;

        let entity = InsertScheduledMessageEntity {
            subscriber_id,
            body: model.body,
            image_url: model.image_url,
            scheduled_for: model.scheduled_for,
            sent: false,
            delivery_outcome: DeliveryOutcome::Pending.as_str().to_string(),
            attempts: 0,
            timezone_offset_minutes: subscriber.timezone_offset_minutes,
            timezone_label: subscriber.timezone_label,
        };

        let message_id = self.message_repo.enqueue(entity).await?;
        info!(
            %subscriber_id,
            %message_id,
            "onboarding: one-off message enqueued"
        );
        Ok(message_id)
    }

    pub async fn register_deposit(
        &self,
        subscriber_id: Uuid,
        model: RegisterDepositModel,
    ) -> Result<Uuid, OnboardingError> {
        self.subscriber_repo
            .find_by_id(subscriber_id)
            .await?
            .ok_or(OnboardingError::SubscriberNotFound)?;

        let entity = InsertPendingDepositEntity {
            subscriber_id,
            currency: model.currency,
            amount_minor: model.amount_minor,
            wallet_address: model.wallet_address,
            transaction_hash: model.transaction_hash,
            status: DepositStatus::Pending.as_str().to_string(),
        };

        let deposit_id = self.deposit_repo.create(entity).await?;
        info!(%subscriber_id, %deposit_id, "onboarding: manual deposit registered for review");
        Ok(deposit_id)
    }

    /// Explicit admin purge; the repository cascades to the subscriber's
    /// scheduled messages and deposits.
    pub async fn purge_subscriber(&self, subscriber_id: Uuid) -> Result<(), OnboardingError> {
        self.subscriber_repo
            .find_by_id(subscriber_id)
            .await?
            .ok_or(OnboardingError::SubscriberNotFound)?;

        self.subscriber_repo.purge(subscriber_id).await?;
        info!(%subscriber_id, "onboarding: subscriber purged with scheduled messages");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use textline::domain::repositories::{
        pending_deposits::MockPendingDepositRepository,
        scheduled_messages::MockScheduledMessageRepository,
        subscribers::MockSubscriberRepository,
    };

    #[tokio::test]
    async fn creates_subscriber_in_pending_state() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        subscriber_repo
            .expect_create()
            .withf(|entity| {
                entity.status == "pending"
                    && entity.payment_provider.is_none()
                    && entity.delivery_preference == "scheduled_timezone"
            })
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(subscriber_id) }));

        let usecase = OnboardingUseCase::new(
            Arc::new(subscriber_repo),
            Arc::new(MockScheduledMessageRepository::new()),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let created = usecase
            .create_subscriber(CreateSubscriberModel {
                phone_number: "5551234567".to_string(),
                carrier: "att".to_string(),
                timezone_offset_minutes: Some(-300),
                timezone_label: Some("EST".to_string()),
                delivery_preference: "scheduled_timezone".to_string(),
                group_id: None,
            })
            .await
            .unwrap();

        assert_eq!(created, subscriber_id);
    }

    #[tokio::test]
    async fn rejects_unknown_delivery_preference() {
        let usecase = OnboardingUseCase::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(MockScheduledMessageRepository::new()),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let result = usecase
            .create_subscriber(CreateSubscriberModel {
                phone_number: "5551234567".to_string(),
                carrier: "att".to_string(),
                timezone_offset_minutes: None,
                timezone_label: None,
                delivery_preference: "carrier_pigeon".to_string(),
                group_id: None,
            })
            .await;

        assert!(matches!(result, Err(OnboardingError::InvalidPreference(_))));
    }

    #[tokio::test]
    async fn one_off_enqueue_requires_existing_subscriber() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        subscriber_repo
            .expect_find_by_id()
            .with(eq(subscriber_id))
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = OnboardingUseCase::new(
            Arc::new(subscriber_repo),
            Arc::new(MockScheduledMessageRepository::new()),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let result = usecase
            .enqueue_one_off(
                subscriber_id,
                EnqueueMessageModel {
                    body: "hello".to_string(),
                    image_url: None,
                    scheduled_for: Utc::now(),
                },
            )
            .await;

        assert!(matches!(result, Err(OnboardingError::SubscriberNotFound)));
    }
}
