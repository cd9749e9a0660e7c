use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};

use logpipe::config::ConsumerConfig;
use logpipe::consumer::{ConsumerSettings, LogConsumer};
use logpipe::metrics;
use logpipe::os_sink::{OpenSearchClient, OpenSearchConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    logpipe::init_tracing();

    let cfg = ConsumerConfig::from_env();

    let metrics_addr = cfg.metrics_addr.clone();
    tokio::spawn(async move {
        info!("starting metrics server on {metrics_addr}");
        if let Err(err) = serve_metrics(&metrics_addr).await {
            error!("metrics server failed: {err:?}");
        }
    });

    let storage = Arc::new(OpenSearchClient::new(OpenSearchConfig {
        url: cfg.opensearch_addr.clone().into(),
        timeout: cfg.http_timeout,
        insecure_tls: true,
    })?);

    let consumer = LogConsumer::new(
        ConsumerSettings {
            brokers: cfg.kafka_brokers.clone().into(),
            topic: cfg.kafka_topic.clone().into(),
            group_id: cfg.kafka_group_id.clone().into(),
            batch_size: cfg.batch_size,
            flush_interval: cfg.flush_interval,
        },
        storage,
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        logpipe::shutdown_signal().await;
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    consumer.run(shutdown_rx).await
}

async fn serve_metrics(addr: &str) -> Result<()> {
    let app = Router::new().route("/metrics", get(|| async { metrics::render() }));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind metrics listener on {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
