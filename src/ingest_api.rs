//! Ingestor HTTP surface: accepts event batches and hands them to the
//! broker producer.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use crate::metrics;
use crate::producer::EventPublisher;
use crate::types::LogEvent;

#[derive(Clone)]
pub struct IngestState {
    pub producer: Arc<dyn EventPublisher>,
}

pub fn router(state: IngestState) -> Router {
    Router::new()
        .route(
            "/logs",
            post(ingest_logs).fallback(logs_method_not_allowed),
        )
        .route("/metrics", get(serve_metrics))
        .with_state(state)
}

pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind ingest listener on {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ingest_logs(
    State(state): State<IngestState>,
    payload: Result<Json<Vec<LogEvent>>, JsonRejection>,
) -> Response {
    // Only the batch form is accepted; a bare object is a client error.
    let Ok(Json(events)) = payload else {
        metrics::HTTP_REQUESTS.with_label_values(&["400", "POST"]).inc();
        return (
            StatusCode::BAD_REQUEST,
            "Invalid request body (expected JSON array)\n",
        )
            .into_response();
    };

    if let Err(err) = state.producer.produce_batch(&events).await {
        warn!("failed to produce batch of {} logs: {err:?}", events.len());
        metrics::HTTP_REQUESTS.with_label_values(&["500", "POST"]).inc();
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process log batch\n",
        )
            .into_response();
    }

    for event in &events {
        metrics::LOGS_PROCESSED
            .with_label_values(&[event.level.as_str(), &event.service, "success"])
            .inc();
    }
    metrics::HTTP_REQUESTS.with_label_values(&["202", "POST"]).inc();
    StatusCode::ACCEPTED.into_response()
}

async fn logs_method_not_allowed(method: Method) -> Response {
    metrics::HTTP_REQUESTS
        .with_label_values(&["405", method.as_str()])
        .inc();
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n").into_response()
}

async fn serve_metrics() -> String {
    metrics::render()
}
