use std::collections::HashMap;
use std::sync::Arc;

use textline::domain::{
    repositories::{
        processed_events::ProcessedEventRepository, subscribers::SubscriberRepository,
    },
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        normalized_events::{ApplyOutcome, EventKind, NormalizedEvent},
        provider_bindings::ProviderBinding,
    },
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("subscriber not found")]
    SubscriberNotFound,
    #[error("subscriber changed concurrently; event must be redelivered")]
    ConcurrentUpdate,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StateMachineError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            StateMachineError::SubscriberNotFound => StatusCode::NOT_FOUND,
            StateMachineError::ConcurrentUpdate => StatusCode::CONFLICT,
            StateMachineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The transition table. `None` means the event is inapplicable in the
/// current state: reported as a conflict and never guessed at.
/// Terminal states (`canceled`, `expired`) accept nothing.
pub fn next_status(current: SubscriptionStatus, kind: EventKind) -> Option<SubscriptionStatus> {
    use EventKind::*;
    use SubscriptionStatus::*;

    match (current, kind) {
        (Pending, Activated) | (Pending, ManuallyVerified) => Some(Active),
        (Active, PaymentFailed) => Some(PastDue),
        (PastDue, Activated) => Some(Active),
        (PastDue, PaymentFailed) => Some(SubscriptionStatus::Expired),
        (Active, EventKind::Canceled) | (PastDue, EventKind::Canceled) => {
            Some(SubscriptionStatus::Canceled)
        }
        (Pending, EventKind::Expired) | (Active, EventKind::Expired) | (PastDue, EventKind::Expired) => {
            Some(SubscriptionStatus::Expired)
        }
        _ => None,
    }
}

/// The sole mutator of subscription status. Applications for the same
/// subscriber are serialized through a per-subscriber lock, and the
/// persisted update is conditional on the expected current status, so
/// neither a racing webhook pair nor a concurrent process can interleave
/// a lost update.
pub struct SubscriptionStateMachine<S, E>
where
    S: SubscriberRepository + Send + Sync + 'static,
    E: ProcessedEventRepository + Send + Sync + 'static,
{
    subscriber_repo: Arc<S>,
    event_repo: Arc<E>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<S, E> SubscriptionStateMachine<S, E>
where
    S: SubscriberRepository + Send + Sync + 'static,
    E: ProcessedEventRepository + Send + Sync + 'static,
{
    pub fn new(subscriber_repo: Arc<S>, event_repo: Arc<E>) -> Self {
        Self {
            subscriber_repo,
            event_repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn subscriber_lock(&self, subscriber_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(subscriber_id).or_default())
    }

    pub async fn apply(&self, event: NormalizedEvent) -> Result<ApplyOutcome, StateMachineError> {
        let lock = self.subscriber_lock(event.subscriber_id).await;
        let _guard = lock.lock().await;

        if self
            .event_repo
            .seen(event.subscriber_id, event.provider, &event.event_id)
            .await?
        {
            info!(
                subscriber_id = %event.subscriber_id,
                provider = %event.provider,
                event_id = %event.event_id,
                "subscription_state: duplicate event id; no-op"
            );
            return Ok(ApplyOutcome::Duplicate);
        }

        let subscriber = self
            .subscriber_repo
            .find_by_id(event.subscriber_id)
            .await
            .map_err(|err| {
                error!(
                    subscriber_id = %event.subscriber_id,
                    db_error = ?err,
                    "subscription_state: failed to load subscriber"
                );
                StateMachineError::Internal(err)
            })?
            .ok_or(StateMachineError::SubscriberNotFound)?;

        let current = SubscriptionStatus::from_str(&subscriber.status);
        let binding = ProviderBinding::from_columns(
            subscriber.payment_provider.as_deref(),
            subscriber.provider_ref.as_deref(),
        );

        // A non-terminal subscriber belongs to exactly one provider; events
        // from any other provider are conflicts until the binding is released
        // by reaching a terminal state.
        if let Some(bound) = binding.provider() {
            if bound != event.provider && !current.is_terminal() {
                warn!(
                    subscriber_id = %event.subscriber_id,
                    bound_provider = %bound,
                    event_provider = %event.provider,
                    kind = %event.kind,
                    "subscription_state: event from non-bound provider"
                );
                return Ok(ApplyOutcome::Conflict {
                    status: current,
                    kind: event.kind,
                });
            }
        }

        let Some(next) = next_status(current, event.kind) else {
            warn!(
                subscriber_id = %event.subscriber_id,
                status = %current,
                kind = %event.kind,
                event_id = %event.event_id,
                "subscription_state: event inapplicable in current state; left unchanged"
            );
            return Ok(ApplyOutcome::Conflict {
                status: current,
                kind: event.kind,
            });
        };

        // First activation confirms the provider binding.
        let bind = match (&binding, event.kind) {
            (ProviderBinding::Unbound, EventKind::Activated)
            | (ProviderBinding::Unbound, EventKind::ManuallyVerified) => Some(
                ProviderBinding::bind(event.provider, event.provider_ref.clone()),
            ),
            _ => None,
        };

        let changed = self
            .subscriber_repo
            .transition_status(event.subscriber_id, current, next, bind)
            .await?;
        if !changed {
            // Another process won the conditional update; the provider will
            // redeliver and the retry resolves against fresh state.
            warn!(
                subscriber_id = %event.subscriber_id,
                expected = %current,
                "subscription_state: conditional update lost; requesting redelivery"
            );
            return Err(StateMachineError::ConcurrentUpdate);
        }

        self.event_repo
            .record(
                event.subscriber_id,
                event.provider,
                &event.event_id,
                event.observed_at,
            )
            .await?;

        info!(
            subscriber_id = %event.subscriber_id,
            previous = %current,
            current_status = %next,
            kind = %event.kind,
            event_id = %event.event_id,
            "subscription_state: transition applied"
        );

        Ok(ApplyOutcome::Applied {
            previous: current,
            current: next,
        })
    }

    /// The read path: dispatch-time status re-checks go through here.
    pub async fn current_status(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Option<SubscriptionStatus>, StateMachineError> {
        Ok(self.subscriber_repo.current_status(subscriber_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use textline::domain::{
        entities::subscribers::SubscriberEntity,
        repositories::{
            processed_events::MockProcessedEventRepository,
            subscribers::MockSubscriberRepository,
        },
        value_objects::enums::payment_providers::PaymentProvider,
    };

    fn sample_subscriber(
        id: Uuid,
        status: SubscriptionStatus,
        provider: Option<PaymentProvider>,
    ) -> SubscriberEntity {
        let now = Utc::now();
        SubscriberEntity {
            id,
            phone_number: "5551234567".to_string(),
            carrier: "verizon".to_string(),
            timezone_offset_minutes: Some(-300),
            timezone_label: Some("EST".to_string()),
            delivery_preference: "scheduled".to_string(),
            status: status.as_str().to_string(),
            payment_provider: provider.map(|p| p.as_str().to_string()),
            provider_ref: provider.map(|_| "ref-1".to_string()),
            group_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_event(subscriber_id: Uuid, kind: EventKind) -> NormalizedEvent {
        NormalizedEvent {
            subscriber_id,
            kind,
            provider: PaymentProvider::CardBilling,
            provider_ref: "ref-1".to_string(),
            event_id: "evt-1".to_string(),
            observed_at: Utc::now(),
            provider_status: Some("active".to_string()),
        }
    }

    #[test]
    fn transition_table_covers_the_full_lifecycle() {
        use EventKind::*;
        use SubscriptionStatus::*;

        assert_eq!(next_status(Pending, Activated), Some(Active));
        assert_eq!(next_status(Pending, ManuallyVerified), Some(Active));
        assert_eq!(next_status(Active, PaymentFailed), Some(PastDue));
        assert_eq!(next_status(PastDue, Activated), Some(Active));
        assert_eq!(
            next_status(PastDue, PaymentFailed),
            Some(SubscriptionStatus::Expired)
        );
        assert_eq!(
            next_status(Active, EventKind::Canceled),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(
            next_status(PastDue, EventKind::Canceled),
            Some(SubscriptionStatus::Canceled)
        );
        assert_eq!(
            next_status(Pending, EventKind::Expired),
            Some(SubscriptionStatus::Expired)
        );
        assert_eq!(
            next_status(Active, EventKind::Expired),
            Some(SubscriptionStatus::Expired)
        );
        assert_eq!(
            next_status(PastDue, EventKind::Expired),
            Some(SubscriptionStatus::Expired)
        );
    }

    #[test]
    fn terminal_states_accept_nothing() {
        use EventKind::*;
        use SubscriptionStatus::*;

        for kind in [Activated, PaymentFailed, Canceled, Expired, ManuallyVerified] {
            assert_eq!(next_status(SubscriptionStatus::Canceled, kind), None);
            assert_eq!(next_status(SubscriptionStatus::Expired, kind), None);
        }
    }

    #[test]
    fn combinations_outside_the_table_are_rejected() {
        use EventKind::*;
        use SubscriptionStatus::*;

        assert_eq!(next_status(Pending, PaymentFailed), None);
        assert_eq!(next_status(Pending, Canceled), None);
        assert_eq!(next_status(Active, Activated), None);
        assert_eq!(next_status(Active, ManuallyVerified), None);
        assert_eq!(next_status(PastDue, ManuallyVerified), None);
    }

    #[tokio::test]
    async fn activates_pending_subscriber_and_records_binding() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let mut event_repo = MockProcessedEventRepository::new();

        event_repo
            .expect_seen()
            .returning(|_, _, _| Box::pin(async { Ok(false) }));
        event_repo
            .expect_record()
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let entity = sample_subscriber(subscriber_id, SubscriptionStatus::Pending, None);
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        subscriber_repo
            .expect_transition_status()
            .withf(move |id, expected, next, binding| {
                *id == subscriber_id
                    && *expected == SubscriptionStatus::Pending
                    && *next == SubscriptionStatus::Active
                    && matches!(binding, Some(ProviderBinding::CardBilling { subscription_ref }) if subscription_ref == "ref-1")
            })
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(true) }));

        let machine =
            SubscriptionStateMachine::new(Arc::new(subscriber_repo), Arc::new(event_repo));

        let outcome = machine
            .apply(sample_event(subscriber_id, EventKind::Activated))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                previous: SubscriptionStatus::Pending,
                current: SubscriptionStatus::Active,
            }
        );
    }

    #[tokio::test]
    async fn duplicate_event_id_is_a_noop() {
        let subscriber_id = Uuid::new_v4();

        // Neither the subscriber load nor the transition may run for a
        // duplicate; unexpected mock calls would panic.
        let subscriber_repo = MockSubscriberRepository::new();
        let mut event_repo = MockProcessedEventRepository::new();
        event_repo
            .expect_seen()
            .returning(|_, _, _| Box::pin(async { Ok(true) }));

        let machine =
            SubscriptionStateMachine::new(Arc::new(subscriber_repo), Arc::new(event_repo));

        let outcome = machine
            .apply(sample_event(subscriber_id, EventKind::Activated))
            .await
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Duplicate);
    }

    #[tokio::test]
    async fn conflicting_event_leaves_state_unchanged() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let mut event_repo = MockProcessedEventRepository::new();

        event_repo
            .expect_seen()
            .returning(|_, _, _| Box::pin(async { Ok(false) }));

        let entity = sample_subscriber(subscriber_id, SubscriptionStatus::Pending, None);
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let machine =
            SubscriptionStateMachine::new(Arc::new(subscriber_repo), Arc::new(event_repo));

        let outcome = machine
            .apply(sample_event(subscriber_id, EventKind::PaymentFailed))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApplyOutcome::Conflict {
                status: SubscriptionStatus::Pending,
                kind: EventKind::PaymentFailed,
            }
        );
    }

    #[tokio::test]
    async fn canceled_subscriber_is_never_resurrected() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let mut event_repo = MockProcessedEventRepository::new();

        event_repo
            .expect_seen()
            .returning(|_, _, _| Box::pin(async { Ok(false) }));

        let entity = sample_subscriber(
            subscriber_id,
            SubscriptionStatus::Canceled,
            Some(PaymentProvider::CardBilling),
        );
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let machine =
            SubscriptionStateMachine::new(Arc::new(subscriber_repo), Arc::new(event_repo));

        let outcome = machine
            .apply(sample_event(subscriber_id, EventKind::Activated))
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::Conflict { .. }));
    }

    #[tokio::test]
    async fn event_from_non_bound_provider_is_a_conflict() {
        let subscriber_id = Uuid::new_v4();

        let mut subscriber_repo = MockSubscriberRepository::new();
        let mut event_repo = MockProcessedEventRepository::new();

        event_repo
            .expect_seen()
            .returning(|_, _, _| Box::pin(async { Ok(false) }));

        let entity = sample_subscriber(
            subscriber_id,
            SubscriptionStatus::Active,
            Some(PaymentProvider::BillingAgreement),
        );
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });

        let machine =
            SubscriptionStateMachine::new(Arc::new(subscriber_repo), Arc::new(event_repo));

        // Card-billing event against a billing-agreement subscriber.
        let outcome = machine
            .apply(sample_event(subscriber_id, EventKind::Canceled))
            .await
            .unwrap();

        assert!(matches!(outcome, ApplyOutcome::Conflict { .. }));
    }

    #[tokio::test]
    async fn concurrent_duplicate_webhooks_apply_exactly_once() {
        let subscriber_id = Uuid::new_v4();

        let seen: Arc<StdMutex<HashSet<String>>> = Arc::new(StdMutex::new(HashSet::new()));

        let mut event_repo = MockProcessedEventRepository::new();
        {
            let seen = Arc::clone(&seen);
            event_repo.expect_seen().returning(move |_, _, event_id| {
                let contains = seen.lock().unwrap().contains(event_id);
                Box::pin(async move { Ok(contains) })
            });
        }
        {
            let seen = Arc::clone(&seen);
            event_repo
                .expect_record()
                .returning(move |_, _, event_id, _| {
                    seen.lock().unwrap().insert(event_id.to_string());
                    Box::pin(async { Ok(()) })
                });
        }

        let mut subscriber_repo = MockSubscriberRepository::new();
        let entity = sample_subscriber(subscriber_id, SubscriptionStatus::Pending, None);
        subscriber_repo.expect_find_by_id().returning(move |_| {
            let entity = entity.clone();
            Box::pin(async move { Ok(Some(entity)) })
        });
        subscriber_repo
            .expect_transition_status()
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(true) }));

        let machine = Arc::new(SubscriptionStateMachine::new(
            Arc::new(subscriber_repo),
            Arc::new(event_repo),
        ));

        let first = tokio::spawn({
            let machine = Arc::clone(&machine);
            let event = sample_event(subscriber_id, EventKind::Activated);
            async move { machine.apply(event).await }
        });
        let second = tokio::spawn({
            let machine = Arc::clone(&machine);
            let event = sample_event(subscriber_id, EventKind::Activated);
            async move { machine.apply(event).await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        let labels = [first.label(), second.label()];
        assert!(labels.contains(&"applied"));
        assert!(labels.contains(&"duplicate"));
    }
}
