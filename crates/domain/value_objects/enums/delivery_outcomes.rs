use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Disposition of a scheduled message. `Pending` until the poller settles it.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryOutcome {
    #[default]
    Pending,
    Sent,
    SkippedInactive,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Pending => "pending",
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::SkippedInactive => "skipped_inactive",
            DeliveryOutcome::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "sent" => DeliveryOutcome::Sent,
            "skipped_inactive" => DeliveryOutcome::SkippedInactive,
            "failed" => DeliveryOutcome::Failed,
            _ => DeliveryOutcome::Pending,
        }
    }
}

impl Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
