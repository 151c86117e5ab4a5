use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::error;

use super::Reporting;

pub fn routes(reporting: Arc<Reporting>) -> Router {
    Router::new()
        .route("/overview", get(overview))
        .with_state(reporting)
}

pub async fn overview(State(reporting): State<Arc<Reporting>>) -> Response {
    match reporting.overview().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            error!(error = ?err, "reports: failed to compute overview");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to compute overview"})),
            )
                .into_response()
        }
    }
}
