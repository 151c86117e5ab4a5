use crate::{
    axum_http::{
        default_routers,
        routers::{self, provider_webhooks, subscribers},
    },
    config::config_model::DotEnvyConfig,
    usecases::{
        delivery_windows::DeliveryWindowCalculator, onboarding::OnboardingUseCase,
        provider_events::ProviderEventNormalizer, reporting::ReportingUseCase,
        subscription_state::SubscriptionStateMachine,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use textline::{
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            pending_deposits::PendingDepositPostgres, processed_events::ProcessedEventPostgres,
            scheduled_messages::ScheduledMessagePostgres,
            service_groups::ServiceGroupPostgres, subscribers::SubscriberPostgres,
        },
    },
    payments::{
        billing_agreement::BillingAgreementClient, card_billing::CardBillingClient,
        crypto_checkout::CryptoCheckoutClient,
    },
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let subscriber_repo = Arc::new(SubscriberPostgres::new(Arc::clone(&db_pool)));
    let message_repo = Arc::new(ScheduledMessagePostgres::new(Arc::clone(&db_pool)));
    let deposit_repo = Arc::new(PendingDepositPostgres::new(Arc::clone(&db_pool)));
    let event_repo = Arc::new(ProcessedEventPostgres::new(Arc::clone(&db_pool)));
    let group_repo = Arc::new(ServiceGroupPostgres::new(Arc::clone(&db_pool)));

    // A single state machine instance serves every route: its per-subscriber
    // locks must cover all paths that apply events.
    let state_machine = Arc::new(SubscriptionStateMachine::new(
        Arc::clone(&subscriber_repo),
        event_repo,
    ));
    let normalizer = Arc::new(ProviderEventNormalizer::new(
        Arc::clone(&subscriber_repo),
        Arc::clone(&deposit_repo),
    ));
    let onboarding = Arc::new(OnboardingUseCase::new(
        Arc::clone(&subscriber_repo),
        Arc::clone(&message_repo),
        deposit_repo,
    ));
    let calculator = Arc::new(DeliveryWindowCalculator::new(
        group_repo,
        Arc::clone(&subscriber_repo),
        Arc::clone(&message_repo),
    ));
    let reporting = Arc::new(ReportingUseCase::new(subscriber_repo, message_repo));

    let webhook_state = provider_webhooks::WebhookState {
        normalizer: Arc::clone(&normalizer),
        state_machine: Arc::clone(&state_machine),
        card_billing: CardBillingClient::new(config.webhooks.card_billing_secret.clone()),
        billing_agreement: BillingAgreementClient::new(
            config.webhooks.billing_agreement_secret.clone(),
        ),
        crypto_checkout: CryptoCheckoutClient::new(
            config.webhooks.crypto_checkout_secret.clone(),
        ),
    };
    let subscriber_state = subscribers::SubscriberState {
        onboarding,
        normalizer,
        state_machine,
    };

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/webhooks",
            routers::provider_webhooks::routes(webhook_state),
        )
        .nest(
            "/api/v1/subscribers",
            routers::subscribers::routes(subscriber_state),
        )
        .nest("/api/v1/groups", routers::groups::routes(calculator))
        .nest("/api/v1/reports", routers::reports::routes(reporting))
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
