//! Batching state for the consumer's fetch → decode → batch → index →
//! commit cycle, kept free of broker and network types so the flush rules
//! are directly testable.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::LogEvent;

/// Position of one accepted broker message, retained so its offset can be
/// committed after a successful index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitToken {
    pub partition: i32,
    pub offset: i64,
}

/// Parallel sequences of decoded events and their commit tokens.
#[derive(Debug, Default)]
pub struct ConsumerBatch {
    events: Vec<LogEvent>,
    tokens: Vec<CommitToken>,
}

impl ConsumerBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            tokens: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: LogEvent, token: CommitToken) {
        self.events.push(event);
        self.tokens.push(token);
        debug_assert_eq!(self.events.len(), self.tokens.len());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn tokens(&self) -> &[CommitToken] {
        &self.tokens
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.tokens.clear();
    }
}

/// Deadline for the next fetch: an empty batch may wait a full interval from
/// now; a partial batch must not outlive the interval since the last flush.
pub fn fetch_deadline(
    now: Instant,
    last_flush: Instant,
    batch_len: usize,
    flush_interval: Duration,
) -> Instant {
    if batch_len == 0 {
        now + flush_interval
    } else {
        last_flush + flush_interval
    }
}

/// True once a non-empty batch has aged past the flush interval.
pub fn interval_elapsed(now: Instant, last_flush: Instant, flush_interval: Duration) -> bool {
    now.duration_since(last_flush) >= flush_interval
}

/// Collapse per-message tokens into the next offset to commit per partition.
pub fn commit_offsets(tokens: &[CommitToken]) -> Vec<CommitToken> {
    let mut next: BTreeMap<i32, i64> = BTreeMap::new();
    for token in tokens {
        let entry = next.entry(token.partition).or_insert(token.offset + 1);
        if token.offset + 1 > *entry {
            *entry = token.offset + 1;
        }
    }
    next.into_iter()
        .map(|(partition, offset)| CommitToken { partition, offset })
        .collect()
}
