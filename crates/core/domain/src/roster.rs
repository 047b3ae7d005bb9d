//! 角色与军团领域类型。

use crate::{CharacterId, OutfitId};

/// Census 批量查询返回的角色记录。
///
/// 只有 world_id 完整的记录才会被构造出来；缺失世界标识的
/// 原始记录在解析阶段即被丢弃。
#[derive(Debug, Clone)]
pub struct CharacterRecord {
    pub character_id: CharacterId,
    pub name: String,
    pub faction_id: i64,
    pub world_id: i64,
    pub outfit: Option<OutfitRecord>,
}

/// 军团记录。faction_id/world_id 取自所属角色（Census 的军团
/// 子对象不携带这两个字段）。
#[derive(Debug, Clone)]
pub struct OutfitRecord {
    pub outfit_id: OutfitId,
    pub alias: String,
    pub name: String,
    pub faction_id: i64,
    pub world_id: i64,
    pub leader_character_id: CharacterId,
    pub member_count: i64,
    pub created_at: i64,
}

/// 角色到军团映射的缓存条目。outfit_id 为 0 表示"已解析、无军团"。
#[derive(Debug, Clone, Copy)]
pub struct OutfitCacheEntry {
    pub outfit_id: OutfitId,
    pub updated_at_ms: i64,
}
