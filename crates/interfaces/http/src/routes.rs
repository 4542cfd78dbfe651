//! `POST /predict`, `GET /health`, `GET /health/ready`, `GET /metrics`
//! (spec §6.1-6.2). Each handler is a thin adapter over `PredictCoordinator`;
//! no business logic lives here.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use chatcoach_coordinator::{CoordinatorError, PredictRequest, PredictResponse};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

async fn predict(State(state): State<AppState>, Json(request): Json<PredictRequest>) -> Response {
    let started = Instant::now();
    let result = state.coordinator.predict(request).await;
    let success = result.is_ok();
    state.metrics.record_request(started.elapsed(), success);

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &CoordinatorError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::warn!(error = %err, status = status.as_u16(), "predict request failed");
    (status, Json(ErrorBody { success: false, message: err.to_string() })).into_response()
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn health_ready() -> Json<HealthBody> {
    Json(HealthBody { status: "ready" })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "text/plain; version=0.0.4")], state.metrics.render())
}
