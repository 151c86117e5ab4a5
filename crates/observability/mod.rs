mod config;
mod discord;
mod layer;
mod notifier;

use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordWebhookSink;
use layer::OperatorAlertLayer;
use notifier::AlertQueue;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes tracing for one process. Operator review events (permanent
/// delivery failures, timezone fallbacks, state conflicts) are WARN/ERROR
/// events and reach the alert webhook through the attached layer.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = config.alerts.as_ref().map(|alerts| {
        let queue = AlertQueue::new(vec![Arc::new(DiscordWebhookSink::new(
            alerts.webhook_url.clone(),
        ))]);

        OperatorAlertLayer::new(queue, config.service_context.clone(), alerts.min_level)
            .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
                alerts.min_level,
            ))
    });

    // RUST_LOG overrides; default stays at info so production is not flooded.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    if config.alerts.is_some() {
        info!(
            component = %config.service_context.component,
            "Operator alert sink enabled"
        );
    }

    Ok(())
}
