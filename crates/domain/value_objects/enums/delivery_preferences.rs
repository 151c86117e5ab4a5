use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryPreference {
    OnDemand,
    #[default]
    Scheduled,
    ScheduledTimezone,
}

impl DeliveryPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPreference::OnDemand => "on_demand",
            DeliveryPreference::Scheduled => "scheduled",
            DeliveryPreference::ScheduledTimezone => "scheduled_timezone",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "on_demand" => Some(DeliveryPreference::OnDemand),
            "scheduled" => Some(DeliveryPreference::Scheduled),
            "scheduled_timezone" => Some(DeliveryPreference::ScheduledTimezone),
            _ => None,
        }
    }
}

impl Display for DeliveryPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
