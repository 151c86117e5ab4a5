use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, info};

use crate::domain::repositories::sms::SmsClient;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

/// Email-to-SMS gateway: each carrier exposes a mail domain that relays
/// `[10-digit-number]@[gateway-domain]` as a text message.
pub struct EmailSmsClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl EmailSmsClient {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .context("failed to build SMTP transport")?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from_email: config.from_email,
        })
    }
}

pub fn sms_email_address(phone_number: &str, carrier: &str) -> Result<String> {
    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
    // US numbers may carry a leading country code; the gateways want 10 digits.
    let digits = match digits.len() {
        10 => digits,
        11 if digits.starts_with('1') => digits[1..].to_string(),
        _ => return Err(anyhow!("unsupported phone number format: {phone_number}")),
    };

    let domain = gateway_domain(carrier)
        .ok_or_else(|| anyhow!("unknown carrier gateway: {carrier}"))?;

    Ok(format!("{digits}@{domain}"))
}

fn gateway_domain(carrier: &str) -> Option<&'static str> {
    match carrier.trim().to_ascii_lowercase().as_str() {
        "att" => Some("txt.att.net"),
        "verizon" | "xfinity" | "visible" | "straighttalk" => Some("vtext.com"),
        "t-mobile" | "tmobile" | "mint" => Some("tmomail.net"),
        "sprint" => Some("messaging.sprintpcs.com"),
        "boost" => Some("myboostmobile.com"),
        "cricket" => Some("sms.cricketwireless.net"),
        "metropcs" | "ultra" => Some("mymetropcs.com"),
        "tracfone" => Some("mmst5.tracfone.com"),
        "uscellular" => Some("email.uscc.net"),
        "virgin" => Some("vmobl.com"),
        "googlefi" | "projectfi" => Some("msg.fi.google.com"),
        "republic" => Some("text.republicwireless.com"),
        "ting" => Some("message.ting.com"),
        "consumercellular" => Some("mailmymobile.net"),
        "lycamobile" => Some("lycamobile.us"),
        _ => None,
    }
}

#[async_trait]
impl SmsClient for EmailSmsClient {
    async fn send(
        &self,
        phone_number: &str,
        carrier: &str,
        body: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        let to_address = sms_email_address(phone_number, carrier)?;
        debug!(carrier, to = %to_address, "sms: relaying via email gateway");

        // Images ride along as a link; MMS attachments are not worth the
        // gateway compatibility trouble.
        let body = match image_url {
            Some(url) => format!("{body}\n\nImage: {url}"),
            None => body.to_string(),
        };

        let email = Message::builder()
            .from(self.from_email.parse().context("invalid from address")?)
            .to(to_address.parse().context("invalid gateway address")?)
            .subject("")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("failed to build gateway email")?;

        self.transport
            .send(email)
            .await
            .context("SMTP relay rejected the message")?;

        info!(carrier, "sms: message relayed");
        Ok(())
    }
}
