use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::scheduled_messages;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = scheduled_messages)]
pub struct ScheduledMessageEntity {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub body: String,
    pub image_url: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_outcome: String,
    pub attempts: i32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scheduled_messages)]
pub struct InsertScheduledMessageEntity {
    pub subscriber_id: Uuid,
    pub body: String,
    pub image_url: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub sent: bool,
    pub delivery_outcome: String,
    pub attempts: i32,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
}
