//! Thin OpenSearch client: single-document and bulk indexing into daily
//! indices.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::warn;

use crate::metrics;
use crate::types::LogEvent;

const INDEX_PREFIX: &str = "app-logs";

#[derive(Clone, Debug)]
pub struct OpenSearchConfig {
    pub url: Arc<str>,
    pub timeout: Duration,
    /// Accept self-signed certificates from a local cluster.
    pub insecure_tls: bool,
}

pub struct OpenSearchClient {
    cfg: OpenSearchConfig,
    client: Client,
}

impl OpenSearchClient {
    pub fn new(cfg: OpenSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .danger_accept_invalid_certs(cfg.insecure_tls)
            .build()
            .context("build opensearch client")?;
        Ok(Self { cfg, client })
    }

    /// Index a single document into its daily index.
    pub async fn index_log(&self, event: &LogEvent) -> Result<()> {
        let _timer = metrics::INDEXING_DURATION.start_timer();

        let index = index_for_timestamp(&event.timestamp, Utc::now());
        let url = format!("{}/{}/_doc", self.base_url(), index);

        let result = self.client.post(&url).json(event).send().await;
        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                metrics::INDEXING_ERRORS.inc();
                bail!("opensearch returned status {}", response.status());
            }
            Err(err) => {
                metrics::INDEXING_ERRORS.inc();
                Err(err).context("execute index request")
            }
        }
    }

    /// Bulk-index a batch; each document routes to its own daily index.
    pub async fn index_batch(&self, events: &[LogEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let _timer = metrics::INDEXING_DURATION.start_timer();

        let body = build_bulk_body(events, Utc::now());
        let url = format!("{}/_bulk", self.base_url());

        let result = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                metrics::INDEXING_ERRORS.inc();
                bail!("opensearch bulk returned status {}", response.status());
            }
            Err(err) => {
                metrics::INDEXING_ERRORS.inc();
                Err(err).context("execute bulk request")
            }
        }
    }

    fn base_url(&self) -> &str {
        self.cfg.url.trim_end_matches('/')
    }
}

/// Daily index name derived from the event timestamp, in UTC. An unparseable
/// timestamp routes to today's index; the stored document keeps the original
/// string either way.
pub fn index_for_timestamp(timestamp: &str, now: DateTime<Utc>) -> String {
    let date = DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);
    format!("{}-{}", INDEX_PREFIX, date.format("%Y.%m.%d"))
}

/// Render the NDJSON bulk payload: an action line then the document, each
/// newline-terminated. Events that fail to serialize are dropped from the
/// batch; the rest proceed.
pub fn build_bulk_body(events: &[LogEvent], now: DateTime<Utc>) -> String {
    let mut body = String::with_capacity(events.len() * 256);
    for event in events {
        let data = match serde_json::to_string(event) {
            Ok(data) => data,
            Err(err) => {
                warn!("failed to serialize event for bulk index: {err}");
                continue;
            }
        };
        let index = index_for_timestamp(&event.timestamp, now);
        body.push_str("{\"index\":{\"_index\":\"");
        body.push_str(&index);
        body.push_str("\"}}\n");
        body.push_str(&data);
        body.push('\n');
    }
    body
}
