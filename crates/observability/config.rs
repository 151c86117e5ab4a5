use std::env;
use tracing::Level;
use url::Url;

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone)]
pub(crate) struct AlertConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) alerts: Option<AlertConfig>,
    /// Warnings captured while parsing, logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "textline".to_string());

        let environment = env_string("STAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let service_context = ServiceContext {
            service_name,
            environment,
            component,
        };

        let (alerts, warnings) = alerts_from_env();

        Self {
            service_context,
            alerts,
            warnings,
        }
    }
}

fn alerts_from_env() -> (Option<AlertConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    let enabled = env_bool("OPERATOR_ALERTS_ENABLED").unwrap_or(true);

    let webhook_url_raw = env_string("OPERATOR_ALERT_WEBHOOK_URL").filter(|v| !v.is_empty());
    let webhook_url = if !enabled {
        None
    } else if let Some(raw) = webhook_url_raw.as_deref() {
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(err) => {
                // The raw URL stays out of the logs; webhook URLs embed secrets.
                warnings.push(format!(
                    "OPERATOR_ALERT_WEBHOOK_URL is set but invalid; operator alerts disabled (parse error: {err})"
                ));
                None
            }
        }
    } else {
        None
    };

    let Some(webhook_url) = webhook_url else {
        return (None, warnings);
    };

    let min_level = match env_string("OPERATOR_ALERT_LEVEL") {
        Some(raw) if !raw.trim().is_empty() => match parse_level(&raw) {
            Some(level) => level,
            None => {
                warnings.push(format!(
                    "OPERATOR_ALERT_LEVEL is invalid (value: {raw}); defaulting to WARN"
                ));
                Level::WARN
            }
        },
        _ => Level::WARN,
    };

    (
        Some(AlertConfig {
            webhook_url,
            min_level,
        }),
        warnings,
    )
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
