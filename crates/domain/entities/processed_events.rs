use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::processed_events;

/// De-duplication ledger for redelivered provider webhooks, keyed by
/// (subscriber, provider, provider-assigned event id).
#[derive(Debug, Clone, Insertable, Selectable, Queryable)]
#[diesel(table_name = processed_events)]
pub struct ProcessedEventEntity {
    pub subscriber_id: Uuid,
    pub provider: String,
    pub event_id: String,
    pub observed_at: DateTime<Utc>,
}
