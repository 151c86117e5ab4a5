use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use textline::{
    domain::value_objects::normalized_events::NormalizedEvent,
    payments::{
        billing_agreement::BillingAgreementClient, card_billing::CardBillingClient,
        crypto_checkout::CryptoCheckoutClient,
    },
};
use tracing::{error, warn};

use super::{Normalizer, StateMachine};

pub struct WebhookState {
    pub normalizer: Arc<Normalizer>,
    pub state_machine: Arc<StateMachine>,
    pub card_billing: CardBillingClient,
    pub billing_agreement: BillingAgreementClient,
    pub crypto_checkout: CryptoCheckoutClient,
}

pub fn routes(state: WebhookState) -> Router {
    Router::new()
        .route("/card-billing", post(card_billing))
        .route("/billing-agreement", post(billing_agreement))
        .route("/crypto", post(crypto_checkout))
        .with_state(Arc::new(state))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn signature_rejected(provider: &str, error: &anyhow::Error) -> Response {
    warn!(
        provider,
        error = %error,
        "webhooks: signature verification failed"
    );
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"outcome": "rejected", "reason": "signature verification failed"})),
    )
        .into_response()
}

/// Every verified payload gets a definite outcome in the response body so
/// the provider can acknowledge and stop retrying.
async fn apply_and_respond(
    state_machine: &StateMachine,
    normalized: Option<NormalizedEvent>,
) -> Response {
    let Some(event) = normalized else {
        return (StatusCode::OK, Json(json!({"outcome": "ignored"}))).into_response();
    };

    match state_machine.apply(event).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(json!({"outcome": outcome.label()}))).into_response()
        }
        Err(err) => {
            error!(error = %err, "webhooks: failed to apply normalized event");
            (
                err.status_code(),
                Json(json!({"outcome": "error", "error": err.to_string()})),
            )
                .into_response()
        }
    }
}

pub async fn card_billing(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_str(&headers, "x-card-signature");
    let event = match state.card_billing.verify_webhook_signature(&body, signature) {
        Ok(event) => event,
        Err(err) => return signature_rejected("card_billing", &err),
    };

    match state.normalizer.normalize_card_billing(&event).await {
        Ok(normalized) => apply_and_respond(&state.state_machine, normalized).await,
        Err(err) => (
            err.status_code(),
            Json(json!({"outcome": "error", "error": err.to_string()})),
        )
            .into_response(),
    }
}

pub async fn billing_agreement(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_str(&headers, "x-transmission-signature");
    let event = match state
        .billing_agreement
        .verify_webhook_signature(&body, signature)
    {
        Ok(event) => event,
        Err(err) => return signature_rejected("billing_agreement", &err),
    };

    match state.normalizer.normalize_billing_agreement(&event).await {
        Ok(normalized) => apply_and_respond(&state.state_machine, normalized).await,
        Err(err) => (
            err.status_code(),
            Json(json!({"outcome": "error", "error": err.to_string()})),
        )
            .into_response(),
    }
}

pub async fn crypto_checkout(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_str(&headers, "x-checkout-signature");
    let event = match state
        .crypto_checkout
        .verify_webhook_signature(&body, signature)
    {
        Ok(event) => event,
        Err(err) => return signature_rejected("crypto", &err),
    };

    match state.normalizer.normalize_crypto_charge(&event).await {
        Ok(normalized) => apply_and_respond(&state.state_machine, normalized).await,
        Err(err) => (
            err.status_code(),
            Json(json!({"outcome": "error", "error": err.to_string()})),
        )
            .into_response(),
    }
}
