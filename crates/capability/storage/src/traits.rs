//! 存储接口 Trait 定义
//!
//! 按关注点拆分：
//! - OnlineStore：在线名单维护
//! - RosterStore：角色/军团缓存与成员关系
//! - MetricsStore：/metrics 聚合查询
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 所有写操作幂等（重复执行结果一致）
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{FactionOnlineRow, OutfitOnlineRow};
use async_trait::async_trait;
use domain::{CharacterId, OutfitCacheEntry, OutfitId};

/// 在线名单存储接口
///
/// 名单中只有角色 id，存在即表示在线。
#[async_trait]
pub trait OnlineStore: Send + Sync {
    /// 清空在线名单。管线启动时调用一次，丢弃上一个进程留下的状态。
    async fn clear_online_set(&self) -> Result<(), StorageError>;

    /// 将角色加入在线名单。重复加入是无害的空操作。
    async fn online_add(&self, character_id: CharacterId) -> Result<(), StorageError>;

    /// 将角色移出在线名单。移除不存在的角色是无害的空操作。
    async fn online_remove(&self, character_id: CharacterId) -> Result<(), StorageError>;
}

/// 角色/军团缓存存储接口
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// 查询角色到军团映射的缓存条目。新鲜度判断由调用方完成。
    async fn lookup_outfit_cache(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<OutfitCacheEntry>, StorageError>;

    /// 写入角色身份（id -> 名称/阵营/世界）。
    async fn upsert_character(
        &self,
        character_id: CharacterId,
        name: &str,
        faction_id: i64,
        world_id: i64,
    ) -> Result<(), StorageError>;

    /// 写入军团身份（id -> 简称/名称/阵营/世界）。
    async fn upsert_outfit(
        &self,
        outfit_id: OutfitId,
        alias: &str,
        name: &str,
        faction_id: i64,
        world_id: i64,
    ) -> Result<(), StorageError>;

    /// 写入角色到军团的映射及解析时间。outfit_id 为 0 表示
    /// "已解析、无军团"，同样占据新鲜度窗口。
    async fn upsert_character_outfit(
        &self,
        character_id: CharacterId,
        outfit_id: OutfitId,
        updated_at_ms: i64,
    ) -> Result<(), StorageError>;
}

/// /metrics 聚合查询接口
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// 各军团当前在线人数（不含无军团角色）。
    async fn outfit_online_counts(&self) -> Result<Vec<OutfitOnlineRow>, StorageError>;

    /// 各阵营/服务器当前在线人数。
    async fn faction_online_counts(&self) -> Result<Vec<FactionOnlineRow>, StorageError>;
}
