use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Billing-agreement integration. Event vocabulary follows the provider's
/// `BILLING.SUBSCRIPTION.*` notification family; the transmission signature
/// is an HMAC of the raw body.
pub struct BillingAgreementClient {
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct BillingAgreementEvent {
    pub id: Option<String>,
    pub event_type: String,
    pub create_time: Option<String>,
    pub resource: serde_json::Value,
}

impl BillingAgreementEvent {
    pub fn agreement_ref(&self) -> Option<&str> {
        self.resource.get("id").and_then(|v| v.as_str())
    }

    /// `custom_id` is stamped with the subscriber id when the agreement is
    /// created during onboarding.
    pub fn custom_subscriber_id(&self) -> Option<Uuid> {
        self.resource
            .get("custom_id")
            .and_then(|v| v.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn resource_status(&self) -> Option<&str> {
        self.resource.get("status").and_then(|v| v.as_str())
    }
}

impl BillingAgreementClient {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        transmission_sig: &str,
    ) -> Result<BillingAgreementEvent> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(transmission_sig.trim())?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid transmission signature");
        }

        let event: BillingAgreementEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;

    fn sign(secret: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature_and_parses_resource() {
        let client = BillingAgreementClient::new("agreement_secret".to_string());
        let payload = br#"{"id":"WH-1","event_type":"BILLING.SUBSCRIPTION.ACTIVATED","resource":{"id":"I-AGREE","status":"ACTIVE"}}"#;

        let event = client
            .verify_webhook_signature(payload, &sign("agreement_secret", payload))
            .unwrap();
        assert_eq!(event.event_type, "BILLING.SUBSCRIPTION.ACTIVATED");
        assert_eq!(event.agreement_ref(), Some("I-AGREE"));
        assert_eq!(event.resource_status(), Some("ACTIVE"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let client = BillingAgreementClient::new("agreement_secret".to_string());
        let payload = br#"{"event_type":"BILLING.SUBSCRIPTION.CANCELLED","resource":{}}"#;
        assert!(
            client
                .verify_webhook_signature(payload, &sign("other_secret", payload))
                .is_err()
        );
    }
}
