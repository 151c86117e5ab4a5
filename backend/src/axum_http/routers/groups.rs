use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::Calculator;

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Slot to schedule; all of the group's slots when omitted.
    pub slot: Option<String>,
    /// Target calendar date; today (UTC) when omitted.
    pub date: Option<NaiveDate>,
}

pub fn routes(calculator: Arc<Calculator>) -> Router {
    Router::new()
        .route("/:group_id/schedule", post(schedule))
        .with_state(calculator)
}

pub async fn schedule(
    State(calculator): State<Arc<Calculator>>,
    Path(group_id): Path<Uuid>,
    Json(request): Json<ScheduleRequest>,
) -> Response {
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());

    let result = match request.slot {
        Some(slot) => calculator
            .compute_schedule(group_id, &slot, date)
            .await
            .map(|summary| vec![summary]),
        None => calculator.schedule_daily(group_id, date).await,
    };

    match result {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(err) => (err.status_code(), Json(json!({"error": err.to_string()}))).into_response(),
    }
}
