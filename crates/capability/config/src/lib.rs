//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub service_id: String,
    pub metrics_addr: String,
    pub websocket_url: String,
    pub census_url: String,
    pub batch_size: usize,
    pub freshness_window_ms: i64,
    pub reconnect_interval_seconds: u64,
    pub raw_queue_capacity: usize,
    pub event_queue_capacity: usize,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("TRACKER_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("TRACKER_DATABASE_URL".to_string()))?;
        let service_id = env::var("TRACKER_SERVICE_ID")
            .map_err(|_| ConfigError::Missing("TRACKER_SERVICE_ID".to_string()))?;
        let metrics_addr = env::var("TRACKER_METRICS_ADDR")
            .map_err(|_| ConfigError::Missing("TRACKER_METRICS_ADDR".to_string()))?;

        let websocket_url = env::var("TRACKER_FEED_URL").unwrap_or_else(|_| {
            format!(
                "wss://push.planetside2.com/streaming?environment=ps2&service-id=s:{}",
                service_id
            )
        });
        let census_url = env::var("TRACKER_CENSUS_URL").unwrap_or_else(|_| {
            format!("http://census.daybreakgames.com/s:{}/get/ps2", service_id)
        });

        let batch_size = read_u64_with_default("TRACKER_BATCH_SIZE", 40)? as usize;
        let freshness_hours = read_u64_with_default("TRACKER_FRESHNESS_HOURS", 48)?;
        let reconnect_interval_seconds = read_u64_with_default("TRACKER_RECONNECT_SECONDS", 15)?;
        let raw_queue_capacity = read_u64_with_default("TRACKER_RAW_QUEUE_CAPACITY", 1024)? as usize;
        let event_queue_capacity =
            read_u64_with_default("TRACKER_EVENT_QUEUE_CAPACITY", 100)? as usize;

        Ok(Self {
            database_url,
            service_id,
            metrics_addr,
            websocket_url,
            census_url,
            batch_size,
            freshness_window_ms: (freshness_hours as i64) * 60 * 60 * 1000,
            reconnect_interval_seconds,
            raw_queue_capacity,
            event_queue_capacity,
        })
    }
}

/// 读取 u64 类型环境变量，缺省时使用默认值。
fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
