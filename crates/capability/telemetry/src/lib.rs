//! 追踪初始化与管线计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 管线计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_decoded: u64,
    pub decode_failures: u64,
    pub events_discarded: u64,
    pub logins: u64,
    pub logouts: u64,
    pub cache_hits: u64,
    pub duplicates_skipped: u64,
    pub batch_lookups: u64,
    pub characters_resolved: u64,
    pub batches_discarded: u64,
}

/// 管线计数器。
pub struct TelemetryMetrics {
    events_received: AtomicU64,
    events_decoded: AtomicU64,
    decode_failures: AtomicU64,
    events_discarded: AtomicU64,
    logins: AtomicU64,
    logouts: AtomicU64,
    cache_hits: AtomicU64,
    duplicates_skipped: AtomicU64,
    batch_lookups: AtomicU64,
    characters_resolved: AtomicU64,
    batches_discarded: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_decoded: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            events_discarded: AtomicU64::new(0),
            logins: AtomicU64::new(0),
            logouts: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            duplicates_skipped: AtomicU64::new(0),
            batch_lookups: AtomicU64::new(0),
            characters_resolved: AtomicU64::new(0),
            batches_discarded: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_decoded: self.events_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            logins: self.logins.load(Ordering::Relaxed),
            logouts: self.logouts.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            batch_lookups: self.batch_lookups.load(Ordering::Relaxed),
            characters_resolved: self.characters_resolved.load(Ordering::Relaxed),
            batches_discarded: self.batches_discarded.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id。
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录收到的原始报文条数。
pub fn record_event_received() {
    metrics().events_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功解码的事件条数。
pub fn record_event_decoded() {
    metrics().events_decoded.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败条数。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录被丢弃的非玩家事件条数（character_id 为 0）。
pub fn record_event_discarded() {
    metrics().events_discarded.fetch_add(1, Ordering::Relaxed);
}

/// 记录登录事件条数。
pub fn record_login() {
    metrics().logins.fetch_add(1, Ordering::Relaxed);
}

/// 记录登出事件条数。
pub fn record_logout() {
    metrics().logouts.fetch_add(1, Ordering::Relaxed);
}

/// 记录因缓存新鲜而跳过的角色数。
pub fn record_cache_hit() {
    metrics().cache_hits.fetch_add(1, Ordering::Relaxed);
}

/// 记录批内重复而跳过的角色数。
pub fn record_duplicate_skipped() {
    metrics().duplicates_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录发起的批量查询次数。
pub fn record_batch_lookup() {
    metrics().batch_lookups.fetch_add(1, Ordering::Relaxed);
}

/// 记录批量查询返回并落库的角色数。
pub fn record_characters_resolved(count: u64) {
    metrics()
        .characters_resolved
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录因连接重置被整批丢弃的次数。
pub fn record_batch_discarded() {
    metrics().batches_discarded.fetch_add(1, Ordering::Relaxed);
}
