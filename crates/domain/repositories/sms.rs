use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

/// Outbound SMS dispatch collaborator. Carrier-address formation and
/// transport choice (email gateway vs. direct API) live behind this seam.
#[async_trait]
#[automock]
pub trait SmsClient {
    async fn send(
        &self,
        phone_number: &str,
        carrier: &str,
        body: &str,
        image_url: Option<&str>,
    ) -> Result<()>;
}
