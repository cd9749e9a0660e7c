//! Logpipe - synthetic log telemetry pipeline library.
//!
//! Three binaries share this crate: a rate-limited generator, an HTTP
//! ingestor publishing to Kafka, and a Kafka consumer bulk-indexing into
//! OpenSearch.

pub mod batch;
pub mod config;
pub mod consumer;
pub mod control_api;
pub mod engine;
pub mod http_sink;
pub mod ingest_api;
pub mod limiter;
pub mod metrics;
pub mod os_sink;
pub mod producer;
pub mod random_source;
pub mod sink;
pub mod types;

use tracing_subscriber::EnvFilter;

/// Install the process-wide tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve once SIGINT or SIGTERM is delivered.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
