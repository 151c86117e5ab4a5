use anyhow::{Ok, Result};

use super::config_model::{Database, Poller, Smtp, WorkerConfig};

pub fn load() -> Result<WorkerConfig> {
    dotenvy::dotenv().ok();

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let poller = Poller {
        interval_secs: std::env::var("POLLER_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?,
        dispatch_timeout_secs: std::env::var("POLLER_DISPATCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?,
        max_attempts: std::env::var("POLLER_MAX_DISPATCH_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?,
    };

    let smtp = Smtp {
        server: std::env::var("SMTP_SERVER").expect("SMTP_SERVER is invalid"),
        port: std::env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()?,
        username: std::env::var("SMTP_USERNAME").expect("SMTP_USERNAME is invalid"),
        password: std::env::var("SMTP_PASSWORD").expect("SMTP_PASSWORD is invalid"),
        from_email: std::env::var("SMTP_FROM_EMAIL").expect("SMTP_FROM_EMAIL is invalid"),
    };

    Ok(WorkerConfig {
        database,
        poller,
        smtp,
    })
}
