use anyhow::{Ok, Result};

use super::config_model::{BackendServer, Database, DotEnvyConfig, WebhookSecrets};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let webhooks = WebhookSecrets {
        card_billing_secret: std::env::var("CARD_BILLING_WEBHOOK_SECRET")
            .expect("CARD_BILLING_WEBHOOK_SECRET is invalid"),
        billing_agreement_secret: std::env::var("BILLING_AGREEMENT_WEBHOOK_SECRET")
            .expect("BILLING_AGREEMENT_WEBHOOK_SECRET is invalid"),
        crypto_checkout_secret: std::env::var("CRYPTO_CHECKOUT_WEBHOOK_SECRET")
            .expect("CRYPTO_CHECKOUT_WEBHOOK_SECRET is invalid"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        webhooks,
    })
}
