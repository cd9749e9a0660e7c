//! Kafka producer used by the ingestor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::warn;

use crate::types::LogEvent;

/// Seam between the HTTP handler and the broker; lets tests substitute a
/// recording publisher.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn produce_batch(&self, events: &[LogEvent]) -> Result<()>;
}

pub struct LogProducer {
    producer: FutureProducer,
    topic: Arc<str>,
}

impl LogProducer {
    pub fn new(brokers: &str, topic: impl Into<Arc<str>>) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .context("create kafka producer")?;
        Ok(Self {
            producer,
            topic: topic.into(),
        })
    }

    pub async fn produce(&self, event: &LogEvent) -> Result<()> {
        self.produce_all(std::slice::from_ref(event)).await
    }

    async fn produce_all(&self, events: &[LogEvent]) -> Result<()> {
        // Enqueue every message before awaiting deliveries so the whole
        // batch is in flight together.
        let mut deliveries = Vec::with_capacity(events.len());
        for event in events {
            let key = partition_key(event);
            let value = serde_json::to_string(event).context("serialize log event")?;
            let record = FutureRecord::to(&self.topic)
                .key(key)
                .payload(&value)
                .timestamp(Utc::now().timestamp_millis());
            match self.producer.send_result(record) {
                Ok(delivery) => deliveries.push(delivery),
                Err((err, _record)) => {
                    return Err(err).context("enqueue kafka message");
                }
            }
        }

        for delivery in deliveries {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((err, _message))) => return Err(err).context("deliver kafka message"),
                Err(_cancelled) => bail!("kafka delivery dropped before completion"),
            }
        }
        Ok(())
    }

    /// Flush outstanding deliveries and release the producer.
    pub fn close(&self) {
        if let Err(err) = self.producer.flush(Duration::from_secs(5)) {
            warn!("failed to flush kafka producer: {err}");
        }
    }
}

#[async_trait]
impl EventPublisher for LogProducer {
    async fn produce_batch(&self, events: &[LogEvent]) -> Result<()> {
        self.produce_all(events).await
    }
}

/// Events sharing a trace land on one partition, preserving per-trace order;
/// synthetic traffic without a trace id falls back to per-service ordering.
pub fn partition_key(event: &LogEvent) -> &str {
    if event.trace_id.is_empty() {
        &event.service
    } else {
        &event.trace_id
    }
}
