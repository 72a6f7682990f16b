use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::buffer::{BufferConfig, RegistryConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub buffer: BufferSettings,
    pub registry: RegistrySettings,
    pub scheduler: SchedulerSettings,
    pub nats: NatsSettings,
    pub archive: ArchiveSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BufferSettings {
    pub target_duration_ms: u64,
    pub timeout_secs: f64,
    pub ready_threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct RegistrySettings {
    pub max_memory_mb: usize,
}

#[derive(Debug, Deserialize)]
pub struct SchedulerSettings {
    pub scan_interval_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct NatsSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveSettings {
    pub enabled: bool,
    pub path: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_memory_bytes: self.registry.max_memory_mb * 1024 * 1024,
            buffer: BufferConfig {
                target_duration_ms: self.buffer.target_duration_ms,
                timeout_secs: self.buffer.timeout_secs,
                ready_threshold: self.buffer.ready_threshold,
            },
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs_f64(self.scheduler.scan_interval_secs)
    }
}
