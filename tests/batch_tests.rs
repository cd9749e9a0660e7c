//! Tests for the consumer batch state machine.

use std::time::Duration;

use logpipe::batch::{
    commit_offsets, fetch_deadline, interval_elapsed, CommitToken, ConsumerBatch,
};
use logpipe::types::{LogEvent, LogLevel};
use tokio::time::Instant;

fn event(n: u32) -> LogEvent {
    LogEvent {
        timestamp: "2026-08-02T10:15:00Z".to_string(),
        level: LogLevel::Info,
        service: "api".to_string(),
        trace_id: String::new(),
        message: format!("message {n}"),
        payload: None,
    }
}

#[test]
fn test_deadline_for_empty_batch_counts_from_now() {
    let base = Instant::now();
    let now = base + Duration::from_secs(10);
    let interval = Duration::from_secs(1);

    let deadline = fetch_deadline(now, base, 0, interval);
    assert_eq!(deadline, now + interval);
}

#[test]
fn test_deadline_for_partial_batch_counts_from_last_flush() {
    let base = Instant::now();
    let now = base + Duration::from_millis(300);
    let interval = Duration::from_secs(1);

    let deadline = fetch_deadline(now, base, 3, interval);
    assert_eq!(deadline, base + interval);
}

#[test]
fn test_interval_elapsed() {
    let base = Instant::now();
    let interval = Duration::from_secs(1);

    assert!(!interval_elapsed(base, base, interval));
    assert!(!interval_elapsed(base + Duration::from_millis(999), base, interval));
    assert!(interval_elapsed(base + Duration::from_secs(1), base, interval));
    assert!(interval_elapsed(base + Duration::from_secs(5), base, interval));
}

#[test]
fn test_commit_offsets_take_max_per_partition() {
    let tokens = [
        CommitToken { partition: 0, offset: 4 },
        CommitToken { partition: 1, offset: 7 },
        CommitToken { partition: 0, offset: 9 },
        CommitToken { partition: 1, offset: 6 },
    ];

    let commits = commit_offsets(&tokens);
    assert_eq!(
        commits,
        vec![
            CommitToken { partition: 0, offset: 10 },
            CommitToken { partition: 1, offset: 8 },
        ]
    );
}

#[test]
fn test_commit_offsets_empty() {
    assert!(commit_offsets(&[]).is_empty());
}

#[test]
fn test_commit_offsets_single_message() {
    let commits = commit_offsets(&[CommitToken { partition: 2, offset: 0 }]);
    assert_eq!(commits, vec![CommitToken { partition: 2, offset: 1 }]);
}

#[test]
fn test_batch_keeps_parallel_lengths() {
    let mut batch = ConsumerBatch::with_capacity(4);
    assert!(batch.is_empty());

    batch.push(event(1), CommitToken { partition: 0, offset: 1 });
    batch.push(event(2), CommitToken { partition: 0, offset: 2 });
    batch.push(event(3), CommitToken { partition: 1, offset: 0 });

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.events().len(), batch.tokens().len());
    assert_eq!(batch.events()[2].message, "message 3");
    assert_eq!(batch.tokens()[2], CommitToken { partition: 1, offset: 0 });
}

#[test]
fn test_batch_clear_resets_both_sequences() {
    let mut batch = ConsumerBatch::with_capacity(2);
    batch.push(event(1), CommitToken { partition: 0, offset: 1 });
    batch.clear();

    assert!(batch.is_empty());
    assert!(batch.events().is_empty());
    assert!(batch.tokens().is_empty());
}
