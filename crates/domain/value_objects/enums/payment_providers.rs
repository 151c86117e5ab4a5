use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentProvider {
    CardBilling,
    BillingAgreement,
    Crypto,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::CardBilling => "card_billing",
            PaymentProvider::BillingAgreement => "billing_agreement",
            PaymentProvider::Crypto => "crypto",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "card_billing" => Some(PaymentProvider::CardBilling),
            "billing_agreement" => Some(PaymentProvider::BillingAgreement),
            "crypto" => Some(PaymentProvider::Crypto),
            _ => None,
        }
    }
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
