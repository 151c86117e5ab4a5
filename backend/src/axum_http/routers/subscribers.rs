use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;
use textline::domain::value_objects::{
    pending_deposits::RegisterDepositModel,
    scheduled_messages::EnqueueMessageModel,
    subscribers::CreateSubscriberModel,
};
use uuid::Uuid;

use super::{Normalizer, Onboarding, StateMachine};
use crate::usecases::provider_events::ManualDepositVerification;

pub struct SubscriberState {
    pub onboarding: Arc<Onboarding>,
    pub normalizer: Arc<Normalizer>,
    pub state_machine: Arc<StateMachine>,
}

pub fn routes(state: SubscriberState) -> Router {
    Router::new()
        .route("/", post(create_subscriber))
        .route("/:subscriber_id", delete(purge_subscriber))
        .route("/:subscriber_id/status", get(subscriber_status))
        .route(
            "/:subscriber_id/messages",
            get(list_messages).post(enqueue_message),
        )
        .route("/:subscriber_id/deposits", post(register_deposit))
        .route("/:subscriber_id/deposits/verify", post(verify_deposit))
        .with_state(Arc::new(state))
}

pub async fn create_subscriber(
    State(state): State<Arc<SubscriberState>>,
    Json(model): Json<CreateSubscriberModel>,
) -> Response {
    match state.onboarding.create_subscriber(model).await {
        Ok(subscriber_id) => (
            StatusCode::CREATED,
            Json(json!({"subscriber_id": subscriber_id})),
        )
            .into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

pub async fn subscriber_status(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response {
    match state.onboarding.subscriber_status(subscriber_id).await {
        Ok(subscriber) => (StatusCode::OK, Json(subscriber)).into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

pub async fn list_messages(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response {
    match state.onboarding.list_messages(subscriber_id).await {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

pub async fn enqueue_message(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
    Json(model): Json<EnqueueMessageModel>,
) -> Response {
    match state.onboarding.enqueue_one_off(subscriber_id, model).await {
        Ok(message_id) => (
            StatusCode::CREATED,
            Json(json!({"message_id": message_id})),
        )
            .into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

pub async fn register_deposit(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
    Json(model): Json<RegisterDepositModel>,
) -> Response {
    match state.onboarding.register_deposit(subscriber_id, model).await {
        Ok(deposit_id) => (
            StatusCode::CREATED,
            Json(json!({"deposit_id": deposit_id})),
        )
            .into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

/// Manual crypto confirmation: verification produces the `ManuallyVerified`
/// event, the state machine applies it under the usual idempotency rules.
pub async fn verify_deposit(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
    Json(request): Json<ManualDepositVerification>,
) -> Response {
    let event = match state
        .normalizer
        .verify_manual_deposit(subscriber_id, request)
        .await
    {
        Ok(event) => event,
        Err(err) => {
            return (err.status_code(), Json(json!({"error": err.to_string()})))
                .into_response();
        }
    };

    match state.state_machine.apply(event).await {
        Ok(outcome) => {
            (StatusCode::OK, Json(json!({"outcome": outcome.label()}))).into_response()
        }
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}

pub async fn purge_subscriber(
    State(state): State<Arc<SubscriberState>>,
    Path(subscriber_id): Path<Uuid>,
) -> Response {
    match state.onboarding.purge_subscriber(subscriber_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}
