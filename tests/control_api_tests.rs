//! Tests for the generator control surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use logpipe::control_api::{router, ControlState};
use logpipe::engine::{Engine, EngineConfig};
use logpipe::random_source::{RandomSource, SourceConfig};
use logpipe::sink::ConsoleSink;
use logpipe::types::LogLevel;
use serde_json::Map;
use tower::ServiceExt;

fn control_state() -> ControlState {
    let source = Arc::new(
        RandomSource::new(SourceConfig {
            weights: HashMap::from([(LogLevel::Info, 1)]),
            services: vec!["api".to_string()],
            service_profiles: HashMap::new(),
            global_metadata: Map::new(),
        })
        .unwrap(),
    );
    let engine = Arc::new(Engine::new(
        source.clone(),
        Arc::new(ConsoleSink::new()),
        EngineConfig {
            workers: 1,
            default_rate: 100,
            batch_size: 10,
            flush_interval: Duration::from_secs(1),
        },
    ));
    ControlState { engine, source }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_set_rate() {
    let state = control_state();
    let engine = state.engine.clone();
    let app = router(state);

    let response = app
        .oneshot(post_json("/rate", r#"{"rate":500}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(engine.rate(), 500);
}

#[tokio::test]
async fn test_set_weights_changes_generation() {
    let state = control_state();
    let source = state.source.clone();
    let app = router(state);

    let response = app
        .oneshot(post_json("/weights", r#"{"ERROR":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..25 {
        assert_eq!(source.generate().unwrap().level, LogLevel::Error);
    }
}

#[tokio::test]
async fn test_invalid_rate_body_rejected() {
    let app = router(control_state());
    let response = app
        .oneshot(post_json("/rate", r#"{"rate":"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_weights_body_rejected() {
    let app = router(control_state());
    let response = app
        .oneshot(post_json("/weights", r#"{"NOT_A_LEVEL":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_method_not_allowed() {
    let app = router(control_state());
    let request = Request::builder()
        .method("GET")
        .uri("/rate")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let app = router(control_state());
    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
