use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    payment_providers::PaymentProvider, subscription_statuses::SubscriptionStatus,
};

/// The closed set of lifecycle signals every provider payload converges on.
/// Nothing downstream of the normalizer branches on provider identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Activated,
    PaymentFailed,
    Canceled,
    Expired,
    ManuallyVerified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Activated => "activated",
            EventKind::PaymentFailed => "payment_failed",
            EventKind::Canceled => "canceled",
            EventKind::Expired => "expired",
            EventKind::ManuallyVerified => "manually_verified",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-agnostic lifecycle event, ready for the state machine.
/// `event_id` is the provider-assigned idempotency token (or the admin
/// action id for manual crypto verification).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedEvent {
    pub subscriber_id: Uuid,
    pub kind: EventKind,
    pub provider: PaymentProvider,
    pub provider_ref: String,
    pub event_id: String,
    pub observed_at: DateTime<Utc>,
    pub provider_status: Option<String>,
}

/// Definite result of applying a normalized event, so webhook callers can
/// always acknowledge the delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied {
        previous: SubscriptionStatus,
        current: SubscriptionStatus,
    },
    Duplicate,
    Conflict {
        status: SubscriptionStatus,
        kind: EventKind,
    },
}

impl ApplyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied { .. } => "applied",
            ApplyOutcome::Duplicate => "duplicate",
            ApplyOutcome::Conflict { .. } => "conflict",
        }
    }
}
