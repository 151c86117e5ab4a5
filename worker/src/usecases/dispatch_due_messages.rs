use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use textline::domain::{
    entities::scheduled_messages::ScheduledMessageEntity,
    repositories::{
        clock::Clock, scheduled_messages::ScheduledMessageRepository, sms::SmsClient,
        subscribers::SubscriberRepository,
    },
    value_objects::enums::{
        delivery_outcomes::DeliveryOutcome, subscription_statuses::SubscriptionStatus,
    },
};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    pub max_attempts: i32,
    pub dispatch_timeout: Duration,
    pub backoff_base_secs: i64,
    pub backoff_cap_secs: i64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            dispatch_timeout: Duration::from_secs(30),
            backoff_base_secs: 60,
            backoff_cap_secs: 3600,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub due: usize,
    pub dispatched: usize,
    pub skipped_inactive: usize,
    pub retried: usize,
    pub permanently_failed: usize,
}

enum MessageOutcome {
    Dispatched,
    SkippedInactive,
    Retried,
    PermanentlyFailed,
}

/// One poll cycle of the delivery engine: scan due messages, re-check each
/// subscriber's current status, dispatch survivors, settle the records.
/// A message is marked sent only after its dispatch call returns; a failed
/// dispatch leaves the record unsent for the next cycle, up to the bounded
/// attempt count.
pub struct DispatchDueMessages<M, S, C, K>
where
    M: ScheduledMessageRepository + Send + Sync + 'static,
    S: SubscriberRepository + Send + Sync + 'static,
    C: SmsClient + Send + Sync + 'static,
    K: Clock + Send + Sync + 'static,
{
    message_repo: Arc<M>,
    subscriber_repo: Arc<S>,
    sms_client: Arc<C>,
    clock: Arc<K>,
    policy: DispatchPolicy,
}

impl<M, S, C, K> DispatchDueMessages<M, S, C, K>
where
    M: ScheduledMessageRepository + Send + Sync + 'static,
    S: SubscriberRepository + Send + Sync + 'static,
    C: SmsClient + Send + Sync + 'static,
    K: Clock + Send + Sync + 'static,
{
    pub fn new(
        message_repo: Arc<M>,
        subscriber_repo: Arc<S>,
        sms_client: Arc<C>,
        clock: Arc<K>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            message_repo,
            subscriber_repo,
            sms_client,
            clock,
            policy,
        }
    }

    pub async fn run_once(&self) -> Result<DispatchReport> {
        let as_of = self.clock.now();
        let due = self.message_repo.due_messages(as_of).await.map_err(|err| {
            error!(db_error = ?err, "delivery: failed to scan due messages");
            err
        })?;

        let mut report = DispatchReport {
            due: due.len(),
            ..Default::default()
        };

        for message in due {
            // One subscriber's failure never aborts the batch.
            match self.process_message(&message).await {
                Ok(MessageOutcome::Dispatched) => report.dispatched += 1,
                Ok(MessageOutcome::SkippedInactive) => report.skipped_inactive += 1,
                Ok(MessageOutcome::Retried) => report.retried += 1,
                Ok(MessageOutcome::PermanentlyFailed) => report.permanently_failed += 1,
                Err(err) => {
                    error!(
                        message_id = %message.id,
                        subscriber_id = %message.subscriber_id,
                        error = %err,
                        "delivery: message processing failed; left for next cycle"
                    );
                }
            }
        }

        if report.due > 0 {
            info!(
                due = report.due,
                dispatched = report.dispatched,
                skipped_inactive = report.skipped_inactive,
                retried = report.retried,
                permanently_failed = report.permanently_failed,
                "delivery: poll cycle complete"
            );
        }

        Ok(report)
    }

    async fn process_message(
        &self,
        message: &ScheduledMessageEntity,
    ) -> Result<MessageOutcome> {
        let subscriber = self.subscriber_repo.find_by_id(message.subscriber_id).await?;

        // Status may have moved between enqueue and dispatch; only currently
        // active subscribers receive anything.
        let subscriber = match subscriber {
            Some(subscriber)
                if SubscriptionStatus::from_str(&subscriber.status)
                    == SubscriptionStatus::Active =>
            {
                subscriber
            }
            Some(subscriber) => {
                info!(
                    message_id = %message.id,
                    subscriber_id = %subscriber.id,
                    status = %subscriber.status,
                    "delivery: subscriber no longer active; marked sent without delivery"
                );
                self.message_repo
                    .mark_sent(message.id, self.clock.now(), DeliveryOutcome::SkippedInactive)
                    .await?;
                return Ok(MessageOutcome::SkippedInactive);
            }
            None => {
                warn!(
                    message_id = %message.id,
                    subscriber_id = %message.subscriber_id,
                    "delivery: subscriber record gone; marked sent without delivery"
                );
                self.message_repo
                    .mark_sent(message.id, self.clock.now(), DeliveryOutcome::SkippedInactive)
                    .await?;
                return Ok(MessageOutcome::SkippedInactive);
            }
        };

        let send = self.sms_client.send(
            &subscriber.phone_number,
            &subscriber.carrier,
            &message.body,
            message.image_url.as_deref(),
        );
        let result = match tokio::time::timeout(self.policy.dispatch_timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "dispatch timed out after {}s",
                self.policy.dispatch_timeout.as_secs()
            )),
        };

        match result {
            Ok(()) => {
                let transitioned = self
                    .message_repo
                    .mark_sent(message.id, self.clock.now(), DeliveryOutcome::Sent)
                    .await?;
                if !transitioned {
                    warn!(
                        message_id = %message.id,
                        "delivery: message was already marked sent"
                    );
                }
                info!(
                    message_id = %message.id,
                    subscriber_id = %subscriber.id,
                    "delivery: message dispatched"
                );
                Ok(MessageOutcome::Dispatched)
            }
            Err(err) => {
                let next_attempt_at = self.clock.now() + self.backoff_delay(message.attempts);
                let attempts = self
                    .message_repo
                    .record_failure(message.id, &err.to_string(), next_attempt_at)
                    .await?;

                if attempts >= self.policy.max_attempts {
                    self.message_repo
                        .mark_failed(message.id, &err.to_string())
                        .await?;
                    error!(
                        message_id = %message.id,
                        subscriber_id = %message.subscriber_id,
                        attempts,
                        error = %err,
                        "delivery: permanent delivery failure"
                    );
                    Ok(MessageOutcome::PermanentlyFailed)
                } else {
                    warn!(
                        message_id = %message.id,
                        subscriber_id = %message.subscriber_id,
                        attempts,
                        next_attempt_at = %next_attempt_at,
                        error = %err,
                        "delivery: dispatch failed; scheduled for retry"
                    );
                    Ok(MessageOutcome::Retried)
                }
            }
        }
    }

    /// Exponential backoff: base, doubled per prior attempt, capped.
    fn backoff_delay(&self, prior_attempts: i32) -> chrono::Duration {
        let exponent = prior_attempts.clamp(0, 10) as u32;
        let seconds = self
            .policy
            .backoff_base_secs
            .saturating_mul(1_i64 << exponent)
            .min(self.policy.backoff_cap_secs);
        chrono::Duration::seconds(seconds)
    }
}
