//! Prometheus metrics shared by the pipeline binaries.
//!
//! Metrics register lazily on first touch, so each process only exposes the
//! series it actually drives.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// Generator side.

pub static LOGS_GENERATED: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "log_generator_logs_generated_total",
            "The total number of logs generated",
        ),
        &["service", "level"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static STORAGE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(HistogramOpts::new(
        "log_generator_storage_duration_seconds",
        "Time taken to store log events",
    ))
    .unwrap();
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

pub static STORAGE_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "log_generator_storage_errors_total",
        "Total number of storage failures",
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static ACTIVE_WORKERS: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new(
        "log_generator_active_workers",
        "Number of currently running worker tasks",
    )
    .unwrap();
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

pub static HTTP_CLIENT_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new(
        "http_client_in_flight_requests",
        "Number of HTTP requests currently in progress",
    )
    .unwrap();
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

// Ingestor side.

pub static LOGS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "log_ingestor_logs_processed_total",
            "The total number of logs processed",
        ),
        &["level", "service", "status"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(
        Opts::new(
            "log_ingestor_http_requests_total",
            "Total number of HTTP requests processed",
        ),
        &["status", "method"],
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

// Consumer side.

pub static MESSAGES_CONSUMED: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "kafka_messages_consumed_total",
        "The total number of messages consumed from Kafka",
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static CONSUMER_LAG: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new(
        "kafka_consumer_lag",
        "The current lag of the consumer group",
    )
    .unwrap();
    REGISTRY.register(Box::new(g.clone())).ok();
    g
});

pub static INDEXING_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new(
        "opensearch_indexing_errors_total",
        "The total number of failed indexing attempts",
    )
    .unwrap();
    REGISTRY.register(Box::new(c.clone())).ok();
    c
});

pub static INDEXING_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(HistogramOpts::new(
        "opensearch_indexing_duration_seconds",
        "The duration of indexing requests to OpenSearch",
    ))
    .unwrap();
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

/// Render the registry in the Prometheus text exposition format.
pub fn render() -> String {
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&REGISTRY.gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}
