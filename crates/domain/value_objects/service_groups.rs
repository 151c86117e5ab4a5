use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::service_groups::ServiceGroupEntity;

/// A named time-of-day broadcast point, e.g. `"morning": { "time": "08:00" }`.
/// Groups carry at most three of these; the map is stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupSlot {
    pub time: String,
    #[serde(default)]
    pub template: Option<String>,
}

impl GroupSlot {
    pub fn parse_time(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.time, "%H:%M").ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceGroupModel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub slots: BTreeMap<String, GroupSlot>,
}

impl From<ServiceGroupEntity> for ServiceGroupModel {
    fn from(entity: ServiceGroupEntity) -> Self {
        let slots = serde_json::from_value(entity.slots.clone()).unwrap_or_default();
        ServiceGroupModel {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            is_active: entity.is_active,
            slots,
        }
    }
}
