use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use textline::{
    domain::{
        repositories::{
            pending_deposits::PendingDepositRepository, subscribers::SubscriberRepository,
        },
        value_objects::{
            enums::{
                deposit_statuses::DepositStatus, payment_providers::PaymentProvider,
            },
            normalized_events::{EventKind, NormalizedEvent},
        },
    },
    payments::{
        billing_agreement::BillingAgreementEvent, card_billing::CardBillingEvent,
        crypto_checkout::CryptoChargeEvent,
    },
};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no pending deposit awaiting review for this subscriber")]
    DepositNotFound,
    #[error("deposit does not match the pending record: {0}")]
    DepositMismatch(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl NormalizeError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            NormalizeError::DepositNotFound => StatusCode::NOT_FOUND,
            NormalizeError::DepositMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NormalizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Admin-side confirmation of a manual wallet transfer. `admin_action_id` is
/// the idempotency token the resulting event carries.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualDepositVerification {
    pub transaction_hash: String,
    pub amount_minor: i32,
    pub currency: String,
    pub admin_action_id: String,
    pub reviewed_by: String,
}

/// Converts verified provider payloads into the closed normalized event set.
/// Malformed or unresolvable payloads yield `None` and a log line; nothing
/// here mutates subscriber state.
pub struct ProviderEventNormalizer<S, D>
where
    S: SubscriberRepository + Send + Sync + 'static,
    D: PendingDepositRepository + Send + Sync + 'static,
{
    subscriber_repo: Arc<S>,
    deposit_repo: Arc<D>,
}

impl<S, D> ProviderEventNormalizer<S, D>
where
    S: SubscriberRepository + Send + Sync + 'static,
    D: PendingDepositRepository + Send + Sync + 'static,
{
    pub fn new(subscriber_repo: Arc<S>, deposit_repo: Arc<D>) -> Self {
        Self {
            subscriber_repo,
            deposit_repo,
        }
    }

    pub async fn normalize_card_billing(
        &self,
        event: &CardBillingEvent,
    ) -> Result<Option<NormalizedEvent>, NormalizeError> {
        let Some(event_id) = event.id.clone() else {
            warn!(event_type = %event.type_, "provider_events: card billing event without id; dropped");
            return Ok(None);
        };

        let kind = match event.type_.as_str() {
            "checkout.completed" | "invoice.payment_succeeded" => EventKind::Activated,
            "invoice.payment_failed" => EventKind::PaymentFailed,
            "subscription.deleted" => EventKind::Canceled,
            "subscription.expired" => EventKind::Expired,
            other => {
                debug!(event_type = other, "provider_events: unhandled card billing event type");
                return Ok(None);
            }
        };

        let Some(provider_ref) = event.subscription_ref().map(str::to_string) else {
            warn!(
                event_id = %event_id,
                event_type = %event.type_,
                "provider_events: card billing event without subscription reference; dropped"
            );
            return Ok(None);
        };

        let subscriber = self
            .resolve_subscriber(
                PaymentProvider::CardBilling,
                &provider_ref,
                event.metadata_subscriber_id(),
            )
            .await?;
        let Some(subscriber_id) = subscriber else {
            warn!(
                event_id = %event_id,
                provider_ref = %provider_ref,
                "provider_events: card billing event matches no subscriber; dropped"
            );
            return Ok(None);
        };

        let observed_at = event
            .created
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Some(NormalizedEvent {
            subscriber_id,
            kind,
            provider: PaymentProvider::CardBilling,
            provider_ref,
            event_id,
            observed_at,
            provider_status: event.object_status().map(str::to_string),
        }))
    }

    pub async fn normalize_billing_agreement(
        &self,
        event: &BillingAgreementEvent,
    ) -> Result<Option<NormalizedEvent>, NormalizeError> {
        let Some(event_id) = event.id.clone() else {
            warn!(event_type = %event.event_type, "provider_events: agreement event without id; dropped");
            return Ok(None);
        };

        let kind = match event.event_type.as_str() {
            "BILLING.SUBSCRIPTION.ACTIVATED" => EventKind::Activated,
            "BILLING.SUBSCRIPTION.PAYMENT.FAILED" => EventKind::PaymentFailed,
            "BILLING.SUBSCRIPTION.CANCELLED" => EventKind::Canceled,
            "BILLING.SUBSCRIPTION.EXPIRED" => EventKind::Expired,
            other => {
                debug!(event_type = other, "provider_events: unhandled agreement event type");
                return Ok(None);
            }
        };

        let Some(provider_ref) = event.agreement_ref().map(str::to_string) else {
            warn!(
                event_id = %event_id,
                event_type = %event.event_type,
                "provider_events: agreement event without agreement reference; dropped"
            );
            return Ok(None);
        };

        let subscriber = self
            .resolve_subscriber(
                PaymentProvider::BillingAgreement,
                &provider_ref,
                event.custom_subscriber_id(),
            )
            .await?;
        let Some(subscriber_id) = subscriber else {
            warn!(
                event_id = %event_id,
                provider_ref = %provider_ref,
                "provider_events: agreement event matches no subscriber; dropped"
            );
            return Ok(None);
        };

        let observed_at = event
            .create_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Some(NormalizedEvent {
            subscriber_id,
            kind,
            provider: PaymentProvider::BillingAgreement,
            provider_ref,
            event_id,
            observed_at,
            provider_status: event.resource_status().map(str::to_string),
        }))
    }

    pub async fn normalize_crypto_charge(
        &self,
        event: &CryptoChargeEvent,
    ) -> Result<Option<NormalizedEvent>, NormalizeError> {
        let Some(event_id) = event.id.clone() else {
            warn!(event_type = %event.type_, "provider_events: crypto charge without id; dropped");
            return Ok(None);
        };

        let kind = match event.type_.as_str() {
            "charge:confirmed" => EventKind::Activated,
            // A charge that failed or timed out never funds the pending
            // subscription; the subscription window is over.
            "charge:failed" | "charge:expired" => EventKind::Expired,
            other => {
                debug!(event_type = other, "provider_events: unhandled crypto charge type");
                return Ok(None);
            }
        };

        let Some(provider_ref) = event.checkout_code().map(str::to_string) else {
            warn!(
                event_id = %event_id,
                "provider_events: crypto charge without checkout code; dropped"
            );
            return Ok(None);
        };

        let subscriber = self
            .resolve_subscriber(
                PaymentProvider::Crypto,
                &provider_ref,
                event.metadata_subscriber_id(),
            )
            .await?;
        let Some(subscriber_id) = subscriber else {
            warn!(
                event_id = %event_id,
                provider_ref = %provider_ref,
                "provider_events: crypto charge matches no subscriber; dropped"
            );
            return Ok(None);
        };

        Ok(Some(NormalizedEvent {
            subscriber_id,
            kind,
            provider: PaymentProvider::Crypto,
            provider_ref,
            event_id,
            observed_at: Utc::now(),
            provider_status: Some(event.type_.clone()),
        }))
    }

    /// Manual crypto confirmation. The admin-supplied transaction must match
    /// the subscriber's pending deposit record on amount and currency; a
    /// mismatch is a reported error and produces no event.
    pub async fn verify_manual_deposit(
        &self,
        subscriber_id: Uuid,
        request: ManualDepositVerification,
    ) -> Result<NormalizedEvent, NormalizeError> {
        let deposit = self
            .deposit_repo
            .find_pending_for_subscriber(subscriber_id)
            .await?
            .ok_or(NormalizeError::DepositNotFound)?;

        if deposit.amount_minor != request.amount_minor
            || !deposit.currency.eq_ignore_ascii_case(&request.currency)
        {
            let detail = format!(
                "expected {} {}, admin supplied {} {}",
                deposit.amount_minor, deposit.currency, request.amount_minor, request.currency
            );
            error!(
                %subscriber_id,
                deposit_id = %deposit.id,
                detail = %detail,
                "provider_events: manual deposit verification mismatch"
            );
            return Err(NormalizeError::DepositMismatch(detail));
        }

        self.deposit_repo
            .mark_reviewed(
                deposit.id,
                DepositStatus::Approved,
                Some(&request.transaction_hash),
                None,
                &request.reviewed_by,
            )
            .await?;

        Ok(NormalizedEvent {
            subscriber_id,
            kind: EventKind::ManuallyVerified,
            provider: PaymentProvider::Crypto,
            provider_ref: request.transaction_hash,
            event_id: request.admin_action_id,
            observed_at: Utc::now(),
            provider_status: Some(DepositStatus::Approved.as_str().to_string()),
        })
    }

    /// Activation payloads carry the subscriber id in provider metadata
    /// (stamped during onboarding); later lifecycle events resolve through
    /// the recorded provider binding.
    async fn resolve_subscriber(
        &self,
        provider: PaymentProvider,
        provider_ref: &str,
        metadata_subscriber_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, NormalizeError> {
        if let Some(subscriber_id) = metadata_subscriber_id {
            let known = self.subscriber_repo.find_by_id(subscriber_id).await?;
            if let Some(subscriber) = known {
                return Ok(Some(subscriber.id));
            }
        }

        let bound = self
            .subscriber_repo
            .find_by_provider_ref(provider, provider_ref)
            .await?;
        Ok(bound.map(|subscriber| subscriber.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use textline::domain::{
        entities::{
            pending_deposits::PendingDepositEntity, subscribers::SubscriberEntity,
        },
        repositories::{
            pending_deposits::MockPendingDepositRepository,
            subscribers::MockSubscriberRepository,
        },
    };

    fn sample_subscriber(id: Uuid) -> SubscriberEntity {
        let now = Utc::now();
        SubscriberEntity {
            id,
            phone_number: "5551234567".to_string(),
            carrier: "att".to_string(),
            timezone_offset_minutes: None,
            timezone_label: None,
            delivery_preference: "scheduled".to_string(),
            status: "pending".to_string(),
            payment_provider: None,
            provider_ref: None,
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_deposit(subscriber_id: Uuid, amount_minor: i32, currency: &str) -> PendingDepositEntity {
        PendingDepositEntity {
            id: Uuid::new_v4(),
            subscriber_id,
            currency: currency.to_string(),
            amount_minor,
            wallet_address: "bc1q-example".to_string(),
            transaction_hash: None,
            status: "pending".to_string(),
            admin_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn card_event(json: serde_json::Value) -> CardBillingEvent {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn checkout_completed_normalizes_to_activated() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let entity = sample_subscriber(subscriber_id);
        subscriber_repo
            .expect_find_by_id()
            .with(eq(subscriber_id))
            .returning(move |_| {
                let entity = entity.clone();
                Box::pin(async move { Ok(Some(entity)) })
            });

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(subscriber_repo),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event = card_event(serde_json::json!({
            "id": "evt-100",
            "type": "checkout.completed",
            "created": 1700000000,
            "data": {"object": {
                "id": "cs_1",
                "subscription": "sub_42",
                "status": "complete",
                "metadata": {"subscriber_id": subscriber_id.to_string()}
            }}
        }));

        let normalized = normalizer
            .normalize_card_billing(&event)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(normalized.subscriber_id, subscriber_id);
        assert_eq!(normalized.kind, EventKind::Activated);
        assert_eq!(normalized.provider, PaymentProvider::CardBilling);
        assert_eq!(normalized.provider_ref, "sub_42");
        assert_eq!(normalized.event_id, "evt-100");
    }

    #[tokio::test]
    async fn payment_failed_resolves_subscriber_by_provider_ref() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let entity = sample_subscriber(subscriber_id);
        subscriber_repo
            .expect_find_by_provider_ref()
            .withf(|provider, provider_ref| {
                *provider == PaymentProvider::CardBilling && provider_ref == "sub_42"
            })
            .returning(move |_, _| {
                let entity = entity.clone();
                Box::pin(async move { Ok(Some(entity)) })
            });

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(subscriber_repo),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event = card_event(serde_json::json!({
            "id": "evt-101",
            "type": "invoice.payment_failed",
            "data": {"object": {"subscription": "sub_42"}}
        }));

        let normalized = normalizer
            .normalize_card_billing(&event)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(normalized.kind, EventKind::PaymentFailed);
        assert_eq!(normalized.subscriber_id, subscriber_id);
    }

    #[tokio::test]
    async fn unknown_event_type_yields_nothing() {
        let normalizer = ProviderEventNormalizer::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event = card_event(serde_json::json!({
            "id": "evt-102",
            "type": "customer.updated",
            "data": {"object": {}}
        }));

        assert!(normalizer.normalize_card_billing(&event).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn event_without_id_is_dropped_as_malformed() {
        let normalizer = ProviderEventNormalizer::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event = card_event(serde_json::json!({
            "type": "invoice.payment_failed",
            "data": {"object": {"subscription": "sub_42"}}
        }));

        assert!(normalizer.normalize_card_billing(&event).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unmatched_subscriber_yields_nothing() {
        let mut subscriber_repo = MockSubscriberRepository::new();
        subscriber_repo
            .expect_find_by_provider_ref()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(subscriber_repo),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event: BillingAgreementEvent = serde_json::from_value(serde_json::json!({
            "id": "WH-55",
            "event_type": "BILLING.SUBSCRIPTION.CANCELLED",
            "resource": {"id": "I-UNKNOWN"}
        }))
        .unwrap();

        assert!(
            normalizer
                .normalize_billing_agreement(&event)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn crypto_confirmed_charge_activates() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let entity = sample_subscriber(subscriber_id);
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(subscriber_repo),
            Arc::new(MockPendingDepositRepository::new()),
        );

        let event: CryptoChargeEvent = serde_json::from_value(serde_json::json!({
            "id": "evt-cc-1",
            "type": "charge:confirmed",
            "data": {"code": "CHG-9", "metadata": {"subscriber_id": subscriber_id.to_string()}}
        }))
        .unwrap();

        let normalized = normalizer
            .normalize_crypto_charge(&event)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(normalized.kind, EventKind::Activated);
        assert_eq!(normalized.provider, PaymentProvider::Crypto);
        assert_eq!(normalized.provider_ref, "CHG-9");
    }

    #[tokio::test]
    async fn manual_deposit_match_yields_manually_verified() {
        let subscriber_id = Uuid::new_v4();
        let deposit = sample_deposit(subscriber_id, 999, "USDC");
        let deposit_id = deposit.id;

        let mut deposit_repo = MockPendingDepositRepository::new();
        deposit_repo
            .expect_find_pending_for_subscriber()
            .with(eq(subscriber_id))
            .returning(move |_| {
                let deposit = deposit.clone();
                Box::pin(async move { Ok(Some(deposit)) })
            });
        deposit_repo
            .expect_mark_reviewed()
            .withf(move |id, status, hash, _, reviewed_by| {
                *id == deposit_id
                    && *status == DepositStatus::Approved
                    && *hash == Some("0xabc")
                    && reviewed_by == "admin-7"
            })
            .times(1)
            .returning(|_, _, _, _, _| Box::pin(async { Ok(()) }));

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(deposit_repo),
        );

        let normalized = normalizer
            .verify_manual_deposit(
                subscriber_id,
                ManualDepositVerification {
                    transaction_hash: "0xabc".to_string(),
                    amount_minor: 999,
                    currency: "usdc".to_string(),
                    admin_action_id: "admin-action-1".to_string(),
                    reviewed_by: "admin-7".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(normalized.kind, EventKind::ManuallyVerified);
        assert_eq!(normalized.provider, PaymentProvider::Crypto);
        assert_eq!(normalized.event_id, "admin-action-1");
    }

    #[tokio::test]
    async fn manual_deposit_amount_mismatch_is_reported() {
        let subscriber_id = Uuid::new_v4();
        let deposit = sample_deposit(subscriber_id, 999, "USDC");

        let mut deposit_repo = MockPendingDepositRepository::new();
        deposit_repo
            .expect_find_pending_for_subscriber()
            .returning(move |_| {
                let deposit = deposit.clone();
                Box::pin(async move { Ok(Some(deposit)) })
            });
        // mark_reviewed must not run on a mismatch.

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(deposit_repo),
        );

        let result = normalizer
            .verify_manual_deposit(
                subscriber_id,
                ManualDepositVerification {
                    transaction_hash: "0xabc".to_string(),
                    amount_minor: 500,
                    currency: "USDC".to_string(),
                    admin_action_id: "admin-action-2".to_string(),
                    reviewed_by: "admin-7".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(NormalizeError::DepositMismatch(_))));
    }

    #[tokio::test]
    async fn manual_deposit_without_pending_record_is_not_found() {
        let mut deposit_repo = MockPendingDepositRepository::new();
        deposit_repo
            .expect_find_pending_for_subscriber()
            .returning(|_| Box::pin(async { Ok(None) }));

        let normalizer = ProviderEventNormalizer::new(
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(deposit_repo),
        );

        let result = normalizer
            .verify_manual_deposit(
                Uuid::new_v4(),
                ManualDepositVerification {
                    transaction_hash: "0xabc".to_string(),
                    amount_minor: 999,
                    currency: "USDC".to_string(),
                    admin_action_id: "admin-action-3".to_string(),
                    reviewed_by: "admin-7".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(NormalizeError::DepositNotFound)));
    }
}
