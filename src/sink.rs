use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::types::LogEvent;

/// Destination for generated log events.
///
/// Implementations only perform I/O; batching and flush timing belong to the
/// engine workers.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn store(&self, event: &LogEvent) -> Result<()>;
    async fn store_batch(&self, events: &[LogEvent]) -> Result<()>;
    /// Release any held resources. Must be called once the engine stops.
    async fn close(&self) -> Result<()>;
}

/// Writes each event as one JSON line to stdout. Local development only.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn store(&self, event: &LogEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("serialize log event")?;
        println!("{line}");
        Ok(())
    }

    async fn store_batch(&self, events: &[LogEvent]) -> Result<()> {
        for event in events {
            self.store(event).await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
