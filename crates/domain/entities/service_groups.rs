use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::service_groups;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = service_groups)]
pub struct ServiceGroupEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slots: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
