//! Tests for the OpenSearch sink.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use logpipe::os_sink::{build_bulk_body, index_for_timestamp, OpenSearchClient, OpenSearchConfig};
use logpipe::types::{LogEvent, LogLevel};

fn wall_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap()
}

fn event_at(timestamp: &str) -> LogEvent {
    LogEvent {
        timestamp: timestamp.to_string(),
        level: LogLevel::Error,
        service: "billing".to_string(),
        trace_id: "00000000-00000000-00000000-00000001".to_string(),
        message: "charge failed".to_string(),
        payload: None,
    }
}

#[test]
fn test_index_from_timestamp() {
    assert_eq!(
        index_for_timestamp("2025-12-11T12:00:00Z", wall_time()),
        "app-logs-2025.12.11"
    );
}

#[test]
fn test_index_uses_utc_date() {
    // 01:30+03:00 is 22:30 UTC on the previous day.
    assert_eq!(
        index_for_timestamp("2025-12-11T01:30:00+03:00", wall_time()),
        "app-logs-2025.12.10"
    );
}

#[test]
fn test_index_fallback_on_unparseable_timestamp() {
    assert_eq!(
        index_for_timestamp("not-a-timestamp", wall_time()),
        "app-logs-2026.08.02"
    );
    assert_eq!(index_for_timestamp("", wall_time()), "app-logs-2026.08.02");
}

#[test]
fn test_bulk_body_layout() {
    let events = vec![
        event_at("2025-12-11T12:00:00Z"),
        event_at("2025-12-12T09:30:00Z"),
    ];

    let body = build_bulk_body(&events, wall_time());
    assert!(body.ends_with('\n'));

    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], r#"{"index":{"_index":"app-logs-2025.12.11"}}"#);
    assert_eq!(lines[2], r#"{"index":{"_index":"app-logs-2025.12.12"}}"#);

    let first: LogEvent = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(first, events[0]);
    let second: LogEvent = serde_json::from_str(lines[3]).unwrap();
    assert_eq!(second, events[1]);
}

#[test]
fn test_bulk_body_preserves_unparseable_timestamp_verbatim() {
    let body = build_bulk_body(&[event_at("garbage")], wall_time());
    let lines: Vec<&str> = body.lines().collect();

    // Routed to today's index, but the stored document keeps the original.
    assert_eq!(lines[0], r#"{"index":{"_index":"app-logs-2026.08.02"}}"#);
    assert!(lines[1].contains("\"timestamp\":\"garbage\""));
}

#[test]
fn test_bulk_body_empty() {
    assert!(build_bulk_body(&[], wall_time()).is_empty());
}

#[tokio::test]
async fn test_index_batch_empty_is_noop() {
    let client = OpenSearchClient::new(OpenSearchConfig {
        url: "http://127.0.0.1:9".into(),
        timeout: Duration::from_secs(1),
        insecure_tls: true,
    })
    .unwrap();

    // No request is issued, so the unroutable address never matters.
    client.index_batch(&[]).await.unwrap();
}

#[tokio::test]
async fn test_index_batch_transport_error() {
    let client = OpenSearchClient::new(OpenSearchConfig {
        url: "http://127.0.0.1:1".into(),
        timeout: Duration::from_secs(1),
        insecure_tls: true,
    })
    .unwrap();

    let err = client
        .index_batch(&[event_at("2025-12-11T12:00:00Z")])
        .await
        .unwrap_err();
    assert!(format!("{err:?}").contains("bulk"));
}
