use anyhow::Result;
use std::{sync::Arc, time::Duration};
use textline::{
    domain::repositories::clock::SystemClock,
    infra::{
        db::{
            postgres::postgres_connection,
            repositories::{
                scheduled_messages::ScheduledMessagePostgres, subscribers::SubscriberPostgres,
            },
        },
        sms::email_gateway::{EmailSmsClient, SmtpConfig},
    },
};
use tokio::sync::watch;
use tracing::{error, info};
use worker::{
    config,
    services::worker_loop,
    usecases::dispatch_due_messages::{DispatchDueMessages, DispatchPolicy},
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    textline::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let message_repo = Arc::new(ScheduledMessagePostgres::new(Arc::clone(&db_pool_arc)));
    let subscriber_repo = Arc::new(SubscriberPostgres::new(Arc::clone(&db_pool_arc)));

    let smtp = &dotenvy_env.smtp;
    let sms_client = Arc::new(EmailSmsClient::new(SmtpConfig {
        server: smtp.server.clone(),
        port: smtp.port,
        username: smtp.username.clone(),
        password: smtp.password.clone(),
        from_email: smtp.from_email.clone(),
    })?);

    let policy = DispatchPolicy {
        max_attempts: dotenvy_env.poller.max_attempts,
        dispatch_timeout: Duration::from_secs(dotenvy_env.poller.dispatch_timeout_secs),
        ..DispatchPolicy::default()
    };

    let usecase = Arc::new(DispatchDueMessages::new(
        message_repo,
        subscriber_repo,
        sms_client,
        Arc::new(SystemClock),
        policy,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = tokio::spawn(worker_loop::run_worker_loop(
        usecase,
        Duration::from_secs(dotenvy_env.poller.interval_secs),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("Received ctrl+C signal; waiting for in-flight cycle to finish");
    shutdown_tx.send(true)?;

    poller.await??;
    info!("Worker stopped cleanly");
    Ok(())
}
