use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DepositStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl DepositStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Approved => "approved",
            DepositStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "approved" => DepositStatus::Approved,
            "rejected" => DepositStatus::Rejected,
            _ => DepositStatus::Pending,
        }
    }
}

impl Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
