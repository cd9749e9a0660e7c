use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::info;

use logpipe::config::IngestorConfig;
use logpipe::ingest_api::{self, IngestState};
use logpipe::producer::LogProducer;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    logpipe::init_tracing();

    let cfg = IngestorConfig::from_env();
    let producer = Arc::new(LogProducer::new(&cfg.kafka_brokers, cfg.kafka_topic.clone())?);

    let app = ingest_api::router(IngestState {
        producer: producer.clone(),
    });

    info!("starting server on {}", cfg.server_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("bind ingest listener on {}", cfg.server_addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(logpipe::shutdown_signal())
        .await?;

    producer.close();
    Ok(())
}
