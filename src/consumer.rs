//! Kafka consumer loop: fetch, decode, batch, bulk-index, then commit.
//!
//! Offsets are committed only after a successful index, giving at-least-once
//! delivery; duplicates after a crash are absorbed by the document store
//! assigning fresh ids.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tokio::sync::watch;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::batch::{commit_offsets, fetch_deadline, interval_elapsed, CommitToken, ConsumerBatch};
use crate::metrics;
use crate::os_sink::OpenSearchClient;
use crate::types::LogEvent;

const FETCH_BACKOFF: Duration = Duration::from_secs(1);
const LAG_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);
const WATERMARK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct ConsumerSettings {
    pub brokers: Arc<str>,
    pub topic: Arc<str>,
    pub group_id: Arc<str>,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

pub struct LogConsumer {
    consumer: Arc<StreamConsumer>,
    storage: Arc<OpenSearchClient>,
    settings: ConsumerSettings,
}

impl LogConsumer {
    pub fn new(settings: ConsumerSettings, storage: Arc<OpenSearchClient>) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &*settings.group_id)
            .set("bootstrap.servers", &*settings.brokers)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .context("create kafka consumer")?;
        consumer
            .subscribe(&[&*settings.topic])
            .context("subscribe to topic")?;

        Ok(Self {
            consumer: Arc::new(consumer),
            storage,
            settings,
        })
    }

    /// Run until the shutdown signal fires. The in-flight batch is dropped
    /// on shutdown; its uncommitted messages are redelivered after restart.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!("starting kafka consumer with batch processing");

        let lag_handle = tokio::spawn(run_lag_reporter(self.consumer.clone(), shutdown.clone()));

        let mut batch = ConsumerBatch::with_capacity(self.settings.batch_size);
        let mut last_flush = Instant::now();

        loop {
            let now = Instant::now();
            if !batch.is_empty() && interval_elapsed(now, last_flush, self.settings.flush_interval)
            {
                if let Err(err) = self.flush(&mut batch, &mut last_flush).await {
                    warn!("flush failed on interval: {err:?}");
                    // The batch is preserved for retry; back off so a down
                    // document store is not hammered in a tight loop.
                    sleep(FETCH_BACKOFF).await;
                }
                continue;
            }
            let deadline = fetch_deadline(
                now,
                last_flush,
                batch.len(),
                self.settings.flush_interval,
            );

            let fetched = tokio::select! {
                _ = shutdown.changed() => break,
                fetched = timeout_at(deadline, self.consumer.recv()) => fetched,
            };

            let message = match fetched {
                // Deadline passed with the upstream quiet: flush what we have.
                Err(_elapsed) => {
                    if let Err(err) = self.flush(&mut batch, &mut last_flush).await {
                        warn!("flush failed on timeout: {err:?}");
                    }
                    continue;
                }
                Ok(Err(err)) => {
                    warn!("failed to fetch message: {err}");
                    sleep(FETCH_BACKOFF).await;
                    continue;
                }
                Ok(Ok(message)) => message,
            };

            let payload = message.payload().unwrap_or_default();
            let event: LogEvent = match serde_json::from_slice(payload) {
                Ok(event) => event,
                Err(err) => {
                    // Poison message: skipped without committing, so its
                    // offset stays pinned until the operator intervenes.
                    warn!(
                        "failed to decode log event at partition {} offset {}: {err}",
                        message.partition(),
                        message.offset()
                    );
                    continue;
                }
            };

            batch.push(
                event,
                CommitToken {
                    partition: message.partition(),
                    offset: message.offset(),
                },
            );

            if batch.len() >= self.settings.batch_size {
                if let Err(err) = self.flush(&mut batch, &mut last_flush).await {
                    warn!("flush failed on size limit: {err:?}");
                }
            }
        }

        lag_handle.abort();
        Ok(())
    }

    /// Index the batch, then commit its offsets. On index failure the batch
    /// is kept intact and retried at the next flush trigger; on commit
    /// failure the batch is still cleared — redelivery after a restart only
    /// produces duplicates, never loss.
    async fn flush(&self, batch: &mut ConsumerBatch, last_flush: &mut Instant) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.storage
            .index_batch(batch.events())
            .await
            .with_context(|| format!("index batch of {} logs", batch.len()))?;

        let mut tpl = TopicPartitionList::new();
        for commit in commit_offsets(batch.tokens()) {
            tpl.add_partition_offset(
                &self.settings.topic,
                commit.partition,
                Offset::Offset(commit.offset),
            )
            .context("build commit offsets")?;
        }
        if let Err(err) = self.consumer.commit(&tpl, CommitMode::Sync) {
            warn!("failed to commit messages: {err}");
        }

        metrics::MESSAGES_CONSUMED.inc_by(batch.len() as u64);
        batch.clear();
        *last_flush = Instant::now();
        Ok(())
    }
}

/// Periodically publish the total consumer lag across assigned partitions.
async fn run_lag_reporter(consumer: Arc<StreamConsumer>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(LAG_SAMPLE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tick.tick() => {}
        }

        let sampled = {
            let consumer = consumer.clone();
            tokio::task::spawn_blocking(move || sample_lag(&consumer)).await
        };
        match sampled {
            Ok(Ok(lag)) => metrics::CONSUMER_LAG.set(lag),
            Ok(Err(err)) => debug!("failed to sample consumer lag: {err:?}"),
            Err(err) => debug!("lag sampler task failed: {err}"),
        }
    }
}

fn sample_lag(consumer: &StreamConsumer) -> Result<i64> {
    let position = consumer.position().context("read consumer position")?;
    let mut total = 0i64;
    for elem in position.elements() {
        let Offset::Offset(current) = elem.offset() else {
            continue;
        };
        let (_low, high) = consumer
            .fetch_watermarks(elem.topic(), elem.partition(), WATERMARK_TIMEOUT)
            .context("fetch watermarks")?;
        total += (high - current).max(0);
    }
    Ok(total)
}
