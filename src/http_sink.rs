//! HTTP sink posting event batches to the ingestor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::metrics;
use crate::sink::Sink;
use crate::types::LogEvent;

#[derive(Clone, Debug)]
pub struct HttpSinkConfig {
    pub url: Arc<str>,
    pub timeout: Duration,
    /// When set, the connection pool keeps no idle connections, forcing a
    /// fresh connection per request. Surfaces peer restarts immediately at
    /// the cost of throughput.
    pub disable_keepalive: bool,
}

pub struct HttpSink {
    cfg: HttpSinkConfig,
    client: Client,
}

impl HttpSink {
    pub fn new(cfg: HttpSinkConfig) -> Result<Self> {
        let idle_per_host = if cfg.disable_keepalive { 0 } else { 100 };
        let client = Client::builder()
            .timeout(cfg.timeout)
            .pool_max_idle_per_host(idle_per_host)
            .build()
            .context("build http sink client")?;
        Ok(Self { cfg, client })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        metrics::HTTP_CLIENT_IN_FLIGHT.inc();
        let result = self.client.post(&*self.cfg.url).json(body).send().await;
        metrics::HTTP_CLIENT_IN_FLIGHT.dec();

        let response = result.context("send request")?;
        let status = response.status();
        if status.as_u16() >= 400 {
            bail!("server returned error status: {status}");
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn store(&self, event: &LogEvent) -> Result<()> {
        self.post_json(event).await
    }

    async fn store_batch(&self, events: &[LogEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.post_json(events).await
    }

    async fn close(&self) -> Result<()> {
        // reqwest tears the idle pool down when the client drops.
        Ok(())
    }
}
