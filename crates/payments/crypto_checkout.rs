use anyhow::Result;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hosted crypto-checkout processor integration. Charge notifications carry
/// an `X-Checkout-Signature`-style header: hex HMAC-SHA256 of the raw body.
pub struct CryptoCheckoutClient {
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct CryptoChargeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: CryptoChargeData,
}

#[derive(Debug, Deserialize)]
pub struct CryptoChargeData {
    pub code: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub pricing: Option<serde_json::Value>,
}

impl CryptoChargeEvent {
    /// The checkout code doubles as the provider payment reference.
    pub fn checkout_code(&self) -> Option<&str> {
        self.data.code.as_deref()
    }

    pub fn metadata_subscriber_id(&self) -> Option<Uuid> {
        self.data
            .metadata
            .get("subscriber_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

impl CryptoCheckoutClient {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<CryptoChargeEvent> {
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature.trim())?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        let event: CryptoChargeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}
