use serde::{Deserialize, Serialize};

use crate::domain::value_objects::enums::payment_providers::PaymentProvider;

/// The single payment-provider reference that is authoritative for a
/// subscriber's billing truth. Holding two bindings at once is
/// unrepresentable; switching providers requires reaching a terminal
/// subscription state first.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderBinding {
    #[default]
    Unbound,
    CardBilling {
        subscription_ref: String,
    },
    BillingAgreement {
        agreement_ref: String,
    },
    Crypto {
        payment_ref: String,
    },
}

impl ProviderBinding {
    pub fn bind(provider: PaymentProvider, reference: String) -> Self {
        match provider {
            PaymentProvider::CardBilling => ProviderBinding::CardBilling {
                subscription_ref: reference,
            },
            PaymentProvider::BillingAgreement => ProviderBinding::BillingAgreement {
                agreement_ref: reference,
            },
            PaymentProvider::Crypto => ProviderBinding::Crypto {
                payment_ref: reference,
            },
        }
    }

    pub fn provider(&self) -> Option<PaymentProvider> {
        match self {
            ProviderBinding::Unbound => None,
            ProviderBinding::CardBilling { .. } => Some(PaymentProvider::CardBilling),
            ProviderBinding::BillingAgreement { .. } => Some(PaymentProvider::BillingAgreement),
            ProviderBinding::Crypto { .. } => Some(PaymentProvider::Crypto),
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            ProviderBinding::Unbound => None,
            ProviderBinding::CardBilling { subscription_ref } => Some(subscription_ref),
            ProviderBinding::BillingAgreement { agreement_ref } => Some(agreement_ref),
            ProviderBinding::Crypto { payment_ref } => Some(payment_ref),
        }
    }

    /// Reassembles the binding from the two nullable storage columns.
    /// Anything unparseable collapses to `Unbound` rather than guessing.
    pub fn from_columns(provider: Option<&str>, reference: Option<&str>) -> Self {
        match (provider.and_then(PaymentProvider::from_str), reference) {
            (Some(provider), Some(reference)) => {
                ProviderBinding::bind(provider, reference.to_string())
            }
            _ => ProviderBinding::Unbound,
        }
    }

    pub fn to_columns(&self) -> (Option<String>, Option<String>) {
        (
            self.provider().map(|p| p.as_str().to_string()),
            self.reference().map(|r| r.to_string()),
        )
    }
}
