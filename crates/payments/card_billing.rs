use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Card-network billing integration: webhook envelope + signature check.
/// Signature header format: `t=<unix>,v1=<hex hmac of "t.payload">`.
pub struct CardBillingClient {
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct CardBillingEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub data: CardBillingEventData,
}

#[derive(Debug, Deserialize)]
pub struct CardBillingEventData {
    pub object: serde_json::Value,
}

impl CardBillingEvent {
    /// The provider subscription reference: `data.object.subscription` for
    /// invoice events, falling back to the object's own id.
    pub fn subscription_ref(&self) -> Option<&str> {
        let object = &self.data.object;
        object
            .get("subscription")
            .and_then(|v| v.as_str())
            .or_else(|| object.get("id").and_then(|v| v.as_str()))
    }

    /// Checkout sessions carry the subscriber id in their metadata, set when
    /// the session was created during onboarding.
    pub fn metadata_subscriber_id(&self) -> Option<Uuid> {
        self.data
            .object
            .get("metadata")
            .and_then(|m| m.get("subscriber_id"))
            .and_then(|v| v.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn object_status(&self) -> Option<&str> {
        self.data.object.get("status").and_then(|v| v.as_str())
    }
}

impl CardBillingClient {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<CardBillingEvent> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in signature header"))?;
        let signature =
            signature.ok_or_else(|| anyhow::anyhow!("missing v1 in signature header"))?;

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature)?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        let event: CardBillingEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let client = CardBillingClient::new("whsec_test".to_string());
        let payload = br#"{"id":"evt_1","type":"invoice.payment_failed","data":{"object":{"subscription":"sub_9"}}}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        let event = client.verify_webhook_signature(payload, &header).unwrap();
        assert_eq!(event.type_, "invoice.payment_failed");
        assert_eq!(event.subscription_ref(), Some("sub_9"));
    }

    #[test]
    fn rejects_tampered_payload() {
        let client = CardBillingClient::new("whsec_test".to_string());
        let payload = br#"{"id":"evt_1","type":"invoice.payment_failed","data":{"object":{}}}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        let tampered = br#"{"id":"evt_2","type":"invoice.payment_failed","data":{"object":{}}}"#;
        assert!(client.verify_webhook_signature(tampered, &header).is_err());
    }

    #[test]
    fn rejects_missing_header_parts() {
        let client = CardBillingClient::new("whsec_test".to_string());
        assert!(client.verify_webhook_signature(b"{}", "v1=deadbeef").is_err());
    }
}
