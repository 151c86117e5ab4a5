use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscribers;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscribers)]
pub struct SubscriberEntity {
    pub id: Uuid,
    pub phone_number: String,
    pub carrier: String,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
    pub delivery_preference: String,
    pub status: String,
    pub payment_provider: Option<String>,
    pub provider_ref: Option<String>,
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscribers)]
pub struct InsertSubscriberEntity {
    pub phone_number: String,
    pub carrier: String,
    pub timezone_offset_minutes: Option<i32>,
    pub timezone_label: Option<String>,
    pub delivery_preference: String,
    pub status: String,
    pub payment_provider: Option<String>,
    pub provider_ref: Option<String>,
    pub group_id: Option<Uuid>,
}
