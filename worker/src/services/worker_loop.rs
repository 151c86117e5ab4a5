use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use textline::domain::repositories::{
    clock::Clock, scheduled_messages::ScheduledMessageRepository, sms::SmsClient,
    subscribers::SubscriberRepository,
};
use tokio::sync::watch;
use tracing::{error, info};

use crate::usecases::dispatch_due_messages::DispatchDueMessages;

/// Fixed-interval delivery poller. The shutdown signal is only consulted
/// between cycles: a message that has gone out over the wire is always
/// recorded as sent before the loop exits, otherwise a restart would
/// dispatch it twice.
pub async fn run_worker_loop<M, S, C, K>(
    usecase: Arc<DispatchDueMessages<M, S, C, K>>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    M: ScheduledMessageRepository + Send + Sync + 'static,
    S: SubscriberRepository + Send + Sync + 'static,
    C: SmsClient + Send + Sync + 'static,
    K: Clock + Send + Sync + 'static,
{
    info!(
        interval_secs = poll_interval.as_secs(),
        "delivery: poller started"
    );

    loop {
        if let Err(error) = usecase.run_once().await {
            error!(error = %error, "delivery: poll cycle failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = shutdown.changed() => {
                info!("delivery: shutdown requested; poller stopping");
                return Ok(());
            }
        }
    }
}
