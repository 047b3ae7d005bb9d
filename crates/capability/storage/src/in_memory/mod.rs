//! 内存存储实现（用于测试与占位）。
//!
//! 单个结构体同时实现三个存储接口，内部用 RwLock 包裹的映射
//! 模拟各张表；聚合查询在内存中完成同样的关联。

use crate::error::StorageError;
use crate::models::{FactionOnlineRow, OutfitOnlineRow};
use crate::traits::{MetricsStore, OnlineStore, RosterStore};
use domain::{CharacterId, OutfitCacheEntry, OutfitId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct CharacterRow {
    name: String,
    faction_id: i64,
    world_id: i64,
}

#[derive(Debug, Clone)]
struct OutfitRow {
    alias: String,
    name: String,
    faction_id: i64,
    world_id: i64,
}

pub struct InMemoryTrackerStore {
    online: RwLock<HashSet<CharacterId>>,
    characters: RwLock<HashMap<CharacterId, CharacterRow>>,
    outfits: RwLock<HashMap<OutfitId, OutfitRow>>,
    memberships: RwLock<HashMap<CharacterId, OutfitCacheEntry>>,
    factions: RwLock<HashMap<i64, String>>,
    worlds: RwLock<HashMap<i64, String>>,
}

impl InMemoryTrackerStore {
    pub fn new() -> Self {
        Self {
            online: RwLock::new(HashSet::new()),
            characters: RwLock::new(HashMap::new()),
            outfits: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            factions: RwLock::new(HashMap::new()),
            worlds: RwLock::new(HashMap::new()),
        }
    }

    /// 灌入阵营查找表（对应静态表 faction_names）。
    pub fn seed_faction(&self, faction_id: i64, tag: impl Into<String>) {
        if let Ok(mut map) = self.factions.write() {
            map.insert(faction_id, tag.into());
        }
    }

    /// 灌入服务器查找表（对应静态表 world_names）。
    pub fn seed_world(&self, world_id: i64, name: impl Into<String>) {
        if let Ok(mut map) = self.worlds.write() {
            map.insert(world_id, name.into());
        }
    }

    /// 当前在线名单的快照（测试断言用）。
    pub fn online_snapshot(&self) -> HashSet<CharacterId> {
        self.online
            .read()
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    /// 指定角色的身份缓存是否存在（测试断言用）。
    pub fn has_character(&self, character_id: CharacterId) -> bool {
        self.characters
            .read()
            .map(|map| map.contains_key(&character_id))
            .unwrap_or(false)
    }

    /// 指定军团的身份缓存是否存在（测试断言用）。
    pub fn has_outfit(&self, outfit_id: OutfitId) -> bool {
        self.outfits
            .read()
            .map(|map| map.contains_key(&outfit_id))
            .unwrap_or(false)
    }
}

impl Default for InMemoryTrackerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OnlineStore for InMemoryTrackerStore {
    async fn clear_online_set(&self) -> Result<(), StorageError> {
        let mut set = self
            .online
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        set.clear();
        Ok(())
    }

    async fn online_add(&self, character_id: CharacterId) -> Result<(), StorageError> {
        let mut set = self
            .online
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        set.insert(character_id);
        Ok(())
    }

    async fn online_remove(&self, character_id: CharacterId) -> Result<(), StorageError> {
        let mut set = self
            .online
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        set.remove(&character_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterStore for InMemoryTrackerStore {
    async fn lookup_outfit_cache(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<OutfitCacheEntry>, StorageError> {
        let map = self
            .memberships
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.get(&character_id).copied())
    }

    async fn upsert_character(
        &self,
        character_id: CharacterId,
        name: &str,
        faction_id: i64,
        world_id: i64,
    ) -> Result<(), StorageError> {
        let mut map = self
            .characters
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(
            character_id,
            CharacterRow {
                name: name.to_string(),
                faction_id,
                world_id,
            },
        );
        Ok(())
    }

    async fn upsert_outfit(
        &self,
        outfit_id: OutfitId,
        alias: &str,
        name: &str,
        faction_id: i64,
        world_id: i64,
    ) -> Result<(), StorageError> {
        let mut map = self
            .outfits
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(
            outfit_id,
            OutfitRow {
                alias: alias.to_string(),
                name: name.to_string(),
                faction_id,
                world_id,
            },
        );
        Ok(())
    }

    async fn upsert_character_outfit(
        &self,
        character_id: CharacterId,
        outfit_id: OutfitId,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        let mut map = self
            .memberships
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(
            character_id,
            OutfitCacheEntry {
                outfit_id,
                updated_at_ms,
            },
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetricsStore for InMemoryTrackerStore {
    async fn outfit_online_counts(&self) -> Result<Vec<OutfitOnlineRow>, StorageError> {
        let online = self
            .online
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let memberships = self
            .memberships
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let outfits = self
            .outfits
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let factions = self
            .factions
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let worlds = self
            .worlds
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;

        let mut counts: HashMap<OutfitId, i64> = HashMap::new();
        for character_id in online.iter() {
            let Some(entry) = memberships.get(character_id) else {
                continue;
            };
            if entry.outfit_id == 0 {
                continue;
            }
            *counts.entry(entry.outfit_id).or_insert(0) += 1;
        }

        let mut items = Vec::new();
        for (outfit_id, online_count) in counts {
            let Some(outfit) = outfits.get(&outfit_id) else {
                continue;
            };
            let Some(faction) = factions.get(&outfit.faction_id) else {
                continue;
            };
            let Some(world) = worlds.get(&outfit.world_id) else {
                continue;
            };
            items.push(OutfitOnlineRow {
                online: online_count,
                alias: outfit.alias.clone(),
                name: outfit.name.clone(),
                faction: faction.clone(),
                world: world.clone(),
            });
        }
        items.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(items)
    }

    async fn faction_online_counts(&self) -> Result<Vec<FactionOnlineRow>, StorageError> {
        let online = self
            .online
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let characters = self
            .characters
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let factions = self
            .factions
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let worlds = self
            .worlds
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;

        let mut counts: HashMap<(i64, i64), i64> = HashMap::new();
        for character_id in online.iter() {
            let Some(character) = characters.get(character_id) else {
                continue;
            };
            *counts
                .entry((character.faction_id, character.world_id))
                .or_insert(0) += 1;
        }

        let mut items = Vec::new();
        for ((faction_id, world_id), online_count) in counts {
            let Some(faction) = factions.get(&faction_id) else {
                continue;
            };
            let Some(world) = worlds.get(&world_id) else {
                continue;
            };
            items.push(FactionOnlineRow {
                online: online_count,
                faction: faction.clone(),
                world: world.clone(),
            });
        }
        items.sort_by(|a, b| (&a.faction, &a.world).cmp(&(&b.faction, &b.world)));
        Ok(items)
    }
}
