use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PulseError, Result};

/// Ticks faster than this would just spin on empty buffers
const MIN_TICK_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub events_topic: String,
    pub logs_topic: String,
}

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub event_tick_interval: Duration,
    pub log_tick_interval: Duration,
    /// Depth at which a buffer logs a falling-behind warning (0 disables)
    pub buffer_high_water: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub kafka: KafkaConfig,
    pub clickhouse: ClickHouseConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let event_tick_ms: u64 = parse_or(&lookup, "EVENT_TICK_INTERVAL_MS", 5_000)?;
        let log_tick_ms: u64 = parse_or(&lookup, "LOG_TICK_INTERVAL_MS", 1_000)?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            kafka: KafkaConfig {
                brokers: string_or("KAFKA_BROKERS", "localhost:9092"),
                group_id: string_or("KAFKA_GROUP_ID", "pulse-ingest"),
                events_topic: string_or("EVENTS_TOPIC", "shop-events"),
                logs_topic: string_or("LOGS_TOPIC", "app-logs"),
            },
            clickhouse: ClickHouseConfig {
                url: string_or("CLICKHOUSE_URL", "http://localhost:8123"),
                database: string_or("CLICKHOUSE_DATABASE", "default"),
                user: string_or("CLICKHOUSE_USER", "default"),
                password: string_or("CLICKHOUSE_PASSWORD", ""),
                table: string_or("CLICKHOUSE_TABLE", "product_activity"),
            },
            pipeline: PipelineConfig {
                event_tick_interval: Duration::from_millis(event_tick_ms.max(MIN_TICK_INTERVAL_MS)),
                log_tick_interval: Duration::from_millis(log_tick_ms.max(MIN_TICK_INTERVAL_MS)),
                buffer_high_water: parse_or(&lookup, "BUFFER_HIGH_WATER", 50_000)?,
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PulseError::Config(format!("{} must be a valid number: {}", key, e))),
        None => Ok(default),
    }
}
