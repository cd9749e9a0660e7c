//! Weighted-random log event source for the generator.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{LogEvent, LogLevel};

/// Message catalog and static fields for one service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceProfile {
    #[serde(default)]
    pub messages: HashMap<LogLevel, Vec<String>>,
    #[serde(default)]
    pub static_fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub weights: HashMap<LogLevel, u32>,
    pub services: Vec<String>,
    #[serde(default)]
    pub service_profiles: HashMap<String, ServiceProfile>,
    #[serde(default)]
    pub global_metadata: Map<String, Value>,
}

/// Event source drawing levels by weight and composing per-service payloads.
///
/// Weights are the only mutable piece: `generate` reads them under a shared
/// guard while the control surface swaps them through `set_weights`.
pub struct RandomSource {
    weights: RwLock<HashMap<LogLevel, u32>>,
    services: Vec<String>,
    profiles: HashMap<String, ServiceProfile>,
    global_metadata: Map<String, Value>,
}

impl RandomSource {
    pub fn new(cfg: SourceConfig) -> Result<Self> {
        let source = Self {
            weights: RwLock::new(cfg.weights),
            services: cfg.services,
            profiles: cfg.service_profiles,
            global_metadata: cfg.global_metadata,
        };
        source.validate()?;
        Ok(source)
    }

    /// Startup validation: an all-zero weight map or an empty service list is
    /// a configuration error, not a runtime failure.
    pub fn validate(&self) -> Result<()> {
        let weights = self.weights.read().unwrap();
        let total: u64 = weights.values().map(|w| *w as u64).sum();
        if total == 0 {
            bail!("level weights must sum to a positive value");
        }
        if self.services.is_empty() {
            bail!("at least one service is required");
        }
        Ok(())
    }

    /// Replace the level weights. No validation: an all-zero map makes every
    /// subsequent `generate` fail until corrected.
    pub fn set_weights(&self, weights: HashMap<LogLevel, u32>) {
        *self.weights.write().unwrap() = weights;
    }

    pub fn generate(&self) -> Result<LogEvent> {
        let mut rng = rand::thread_rng();

        let level = self.pick_level(&mut rng)?;
        let service = self.services[rng.gen_range(0..self.services.len())].clone();
        let message = self.pick_message(&mut rng, &service, level);
        let payload = self.pick_payload(&service);
        let trace_id = format!(
            "{:08x}-{:08x}-{:08x}-{:08x}",
            rng.gen::<u32>(),
            rng.gen::<u32>(),
            rng.gen::<u32>(),
            rng.gen::<u32>()
        );

        Ok(LogEvent {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            level,
            service,
            trace_id,
            message,
            payload,
        })
    }

    fn pick_level(&self, rng: &mut impl Rng) -> Result<LogLevel> {
        let weights = self.weights.read().unwrap();
        let total: u64 = weights.values().map(|w| *w as u64).sum();
        if total == 0 {
            bail!("level weights must sum to a positive value");
        }

        // Walk levels in severity order so identical weight maps yield the
        // same distribution for a given RNG sequence.
        let pick = rng.gen_range(0..total);
        let mut cumulative = 0u64;
        for level in LogLevel::ALL {
            cumulative += weights.get(&level).copied().unwrap_or(0) as u64;
            if pick < cumulative {
                return Ok(level);
            }
        }

        Ok(LogLevel::Info)
    }

    fn pick_message(&self, rng: &mut impl Rng, service: &str, level: LogLevel) -> String {
        if let Some(messages) = self
            .profiles
            .get(service)
            .and_then(|profile| profile.messages.get(&level))
        {
            if !messages.is_empty() {
                return messages[rng.gen_range(0..messages.len())].clone();
            }
        }
        format!("Default {level} message for {service}")
    }

    fn pick_payload(&self, service: &str) -> Option<Map<String, Value>> {
        let mut payload = Map::new();
        for (key, value) in &self.global_metadata {
            payload.insert(key.clone(), value.clone());
        }
        if let Some(profile) = self.profiles.get(service) {
            for (key, value) in &profile.static_fields {
                payload.insert(key.clone(), value.clone());
            }
        }
        if payload.is_empty() {
            None
        } else {
            Some(payload)
        }
    }
}
