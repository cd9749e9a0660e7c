//! Tests for the Kafka producer key policy.

use logpipe::producer::partition_key;
use logpipe::types::{LogEvent, LogLevel};

fn event(trace_id: &str, service: &str) -> LogEvent {
    LogEvent {
        timestamp: "2026-08-02T10:15:00Z".to_string(),
        level: LogLevel::Info,
        service: service.to_string(),
        trace_id: trace_id.to_string(),
        message: "hello".to_string(),
        payload: None,
    }
}

#[test]
fn test_key_prefers_trace_id() {
    let ev = event("abc", "billing");
    assert_eq!(partition_key(&ev), "abc");
}

#[test]
fn test_key_falls_back_to_service() {
    let ev = event("", "billing");
    assert_eq!(partition_key(&ev), "billing");
}

#[test]
fn test_same_trace_shares_key() {
    let first = event("abc", "billing");
    let second = event("abc", "auth");
    assert_eq!(partition_key(&first), partition_key(&second));
}
