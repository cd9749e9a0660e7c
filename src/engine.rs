//! Generator engine: a pool of rate-limited workers batching events into a
//! sink.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::limiter::RateLimiter;
use crate::metrics;
use crate::random_source::RandomSource;
use crate::sink::Sink;
use crate::types::LogEvent;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub workers: usize,
    pub default_rate: u32,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

/// Owns the shared limiter and spawns one batching worker per slot.
///
/// A single limiter with burst = workers gives a process-wide rate ceiling
/// independent of worker count.
pub struct Engine {
    source: Arc<RandomSource>,
    sink: Arc<dyn Sink>,
    cfg: EngineConfig,
    limiter: Arc<RateLimiter>,
}

impl Engine {
    pub fn new(source: Arc<RandomSource>, sink: Arc<dyn Sink>, cfg: EngineConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(cfg.default_rate, cfg.workers));
        Self {
            source,
            sink,
            cfg,
            limiter,
        }
    }

    /// Run all workers until the shutdown signal fires, then close the sink.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "engine starting with {} workers at {} logs/sec",
            self.cfg.workers, self.cfg.default_rate
        );

        let mut handles = Vec::with_capacity(self.cfg.workers);
        for _ in 0..self.cfg.workers {
            handles.push(tokio::spawn(worker(
                self.source.clone(),
                self.sink.clone(),
                self.limiter.clone(),
                self.cfg.clone(),
                shutdown.clone(),
            )));
        }
        join_all(handles).await;

        if let Err(err) = self.sink.close().await {
            warn!("error closing sink: {err:?}");
        }
        info!("engine stopped");
        Ok(())
    }

    /// Retarget the shared limiter; applies to all workers on their next
    /// token wait.
    pub fn set_rate(&self, rate: u32) {
        self.limiter.set_rate(rate);
        info!("engine target rate updated to {rate} logs/sec");
    }

    pub fn rate(&self) -> u32 {
        self.limiter.rate()
    }
}

async fn worker(
    source: Arc<RandomSource>,
    sink: Arc<dyn Sink>,
    limiter: Arc<RateLimiter>,
    cfg: EngineConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    metrics::ACTIVE_WORKERS.inc();

    let mut batch: Vec<LogEvent> = Vec::with_capacity(cfg.batch_size);
    let mut last_flush = Instant::now();

    loop {
        tokio::select! {
            _ = limiter.acquire() => {}
            _ = shutdown.changed() => {
                // Best-effort flush of whatever accumulated before exit.
                flush(sink.as_ref(), &mut batch, &mut last_flush).await;
                break;
            }
        }

        let event = match source.generate() {
            Ok(event) => event,
            Err(err) => {
                warn!("failed to generate event: {err}");
                continue;
            }
        };

        metrics::LOGS_GENERATED
            .with_label_values(&[&event.service, event.level.as_str()])
            .inc();
        batch.push(event);

        if batch.len() >= cfg.batch_size || last_flush.elapsed() >= cfg.flush_interval {
            flush(sink.as_ref(), &mut batch, &mut last_flush).await;
        }
    }

    metrics::ACTIVE_WORKERS.dec();
}

/// Hand the batch to the sink and reset it. Errors are counted and dropped:
/// the generator is a lossy producer, a blocked worker is worth less than a
/// lost batch of synthetic events.
async fn flush(sink: &dyn Sink, batch: &mut Vec<LogEvent>, last_flush: &mut Instant) {
    if batch.is_empty() {
        return;
    }

    let started = Instant::now();
    if let Err(err) = sink.store_batch(batch).await {
        metrics::STORAGE_ERRORS.inc();
        warn!("worker failed to store batch of {}: {err:?}", batch.len());
    }
    metrics::STORAGE_DURATION.observe(started.elapsed().as_secs_f64());

    batch.clear();
    *last_flush = Instant::now();
}
