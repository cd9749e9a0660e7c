//! Control surface for a running generator: runtime mutation of the target
//! rate and the level weights. Operator-local, unauthenticated.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::engine::Engine;
use crate::metrics;
use crate::random_source::RandomSource;
use crate::types::LogLevel;

#[derive(Clone)]
pub struct ControlState {
    pub engine: Arc<Engine>,
    pub source: Arc<RandomSource>,
}

pub fn router(state: ControlState) -> Router {
    Router::new()
        .route("/rate", post(set_rate))
        .route("/weights", post(set_weights))
        .route("/metrics", get(serve_metrics))
        .with_state(state)
}

pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind control listener on {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    rate: u32,
}

async fn set_rate(
    State(state): State<ControlState>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON\n").into_response();
    };
    state.engine.set_rate(req.rate);
    (
        StatusCode::OK,
        format!("Rate updated to {} logs/sec\n", req.rate),
    )
        .into_response()
}

async fn set_weights(
    State(state): State<ControlState>,
    payload: Result<Json<HashMap<LogLevel, u32>>, JsonRejection>,
) -> Response {
    let Ok(Json(weights)) = payload else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON\n").into_response();
    };
    state.source.set_weights(weights);
    (StatusCode::OK, "Weights updated\n").into_response()
}

async fn serve_metrics() -> String {
    metrics::render()
}
