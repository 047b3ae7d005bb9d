//! Postgres /metrics 聚合查询实现

use crate::error::StorageError;
use crate::models::{FactionOnlineRow, OutfitOnlineRow};
use crate::traits::MetricsStore;
use sqlx::{PgPool, Row};

pub struct PgMetricsStore {
    pub pool: PgPool,
}

impl PgMetricsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MetricsStore for PgMetricsStore {
    async fn outfit_online_counts(&self) -> Result<Vec<OutfitOnlineRow>, StorageError> {
        let rows = sqlx::query(
            "select count(online_players.character_id) as online, \
             outfit_names.alias, outfit_names.name, \
             faction_names.tag, world_names.name as world \
             from online_players \
             inner join character_outfit \
             on online_players.character_id = character_outfit.character_id \
             inner join outfit_names on character_outfit.outfit_id = outfit_names.id \
             inner join faction_names on outfit_names.faction_id = faction_names.id \
             inner join world_names on outfit_names.world_id = world_names.id \
             where character_outfit.outfit_id != 0 \
             group by outfit_names.alias, outfit_names.name, \
             faction_names.tag, world_names.name",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(OutfitOnlineRow {
                online: row.try_get("online")?,
                alias: row.try_get("alias")?,
                name: row.try_get("name")?,
                faction: row.try_get("tag")?,
                world: row.try_get("world")?,
            });
        }
        Ok(items)
    }

    async fn faction_online_counts(&self) -> Result<Vec<FactionOnlineRow>, StorageError> {
        let rows = sqlx::query(
            "select count(online_players.character_id) as online, \
             faction_names.tag, world_names.name as world \
             from online_players \
             inner join character_names \
             on online_players.character_id = character_names.id \
             inner join faction_names on character_names.faction_id = faction_names.id \
             inner join world_names on character_names.world_id = world_names.id \
             group by faction_names.tag, world_names.name",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(FactionOnlineRow {
                online: row.try_get("online")?,
                faction: row.try_get("tag")?,
                world: row.try_get("world")?,
            });
        }
        Ok(items)
    }
}
