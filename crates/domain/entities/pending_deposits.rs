use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::pending_deposits;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = pending_deposits)]
pub struct PendingDepositEntity {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub currency: String,
    pub amount_minor: i32,
    pub wallet_address: String,
    pub transaction_hash: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pending_deposits)]
pub struct InsertPendingDepositEntity {
    pub subscriber_id: Uuid,
    pub currency: String,
    pub amount_minor: i32,
    pub wallet_address: String,
    pub transaction_hash: Option<String>,
    pub status: String,
}
