use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::random_source::SourceConfig;

/// Generator configuration, loaded from a YAML document.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub engine: EngineSettings,
    pub storage: StorageSettings,
    pub generator: SourceConfig,
    #[serde(default = "default_control_addr")]
    pub control_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub workers: usize,
    pub default_rate: u32,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
}

impl EngineSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Console,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(rename = "type")]
    pub kind: StorageKind,
    #[serde(default)]
    pub http: Option<HttpSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub disable_keepalive: bool,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GeneratorConfig {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: GeneratorConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.workers == 0 {
            anyhow::bail!("engine.workers must be at least 1");
        }
        if self.engine.batch_size == 0 {
            anyhow::bail!("engine.batch_size must be at least 1");
        }
        let total: u64 = self.generator.weights.values().map(|w| *w as u64).sum();
        if total == 0 {
            anyhow::bail!("generator.weights must sum to a positive value");
        }
        if self.generator.services.is_empty() {
            anyhow::bail!("generator.services must not be empty");
        }
        if self.storage.kind == StorageKind::Http && self.storage.http.is_none() {
            anyhow::bail!("storage.http is required when storage.type is http");
        }
        Ok(())
    }
}

/// Ingestor settings, environment-driven with local defaults.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    pub kafka_brokers: String,
    pub kafka_topic: String,
    pub server_addr: String,
}

impl IngestorConfig {
    pub fn from_env() -> Self {
        Self {
            kafka_brokers: env_str("KAFKA_BROKERS", "localhost:9092"),
            kafka_topic: env_str("KAFKA_TOPIC", "logs"),
            server_addr: env_str("SERVER_ADDR", "0.0.0.0:8080"),
        }
    }
}

/// Consumer settings, environment-driven with local defaults.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub kafka_brokers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub opensearch_addr: String,
    pub metrics_addr: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub http_timeout: Duration,
}

impl ConsumerConfig {
    pub fn from_env() -> Self {
        Self {
            kafka_brokers: env_str("KAFKA_BROKERS", "localhost:9092"),
            kafka_topic: env_str("KAFKA_TOPIC", "logs"),
            kafka_group_id: env_str("KAFKA_GROUP_ID", "log-consumer-group"),
            opensearch_addr: env_str("OPENSEARCH_ADDR", "https://localhost:9200"),
            metrics_addr: env_str("METRICS_ADDR", "0.0.0.0:2112"),
            batch_size: env_usize("BATCH_SIZE", 500),
            flush_interval: Duration::from_millis(env_u64("FLUSH_INTERVAL_MS", 1_000)),
            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 30)),
        }
    }
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("com", "logpipe", "logpipe")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

fn default_control_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn env_str(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
