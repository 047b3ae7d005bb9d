//! Postgres 角色/军团缓存实现

use crate::error::StorageError;
use crate::traits::RosterStore;
use domain::{CharacterId, OutfitCacheEntry, OutfitId};
use sqlx::{PgPool, Row};

pub struct PgRosterStore {
    pub pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RosterStore for PgRosterStore {
    async fn lookup_outfit_cache(
        &self,
        character_id: CharacterId,
    ) -> Result<Option<OutfitCacheEntry>, StorageError> {
        let row = sqlx::query(
            "select outfit_id, updated_at_ms from character_outfit \
             where character_id = $1",
        )
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(OutfitCacheEntry {
            outfit_id: row.try_get("outfit_id")?,
            updated_at_ms: row.try_get("updated_at_ms")?,
        }))
    }

    async fn upsert_character(
        &self,
        character_id: CharacterId,
        name: &str,
        faction_id: i64,
        world_id: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "insert into character_names (id, name, faction_id, world_id) \
             values ($1, $2, $3, $4) \
             on conflict (id) do update set \
             name = excluded.name, \
             faction_id = excluded.faction_id, \
             world_id = excluded.world_id",
        )
        .bind(character_id)
        .bind(name)
        .bind(faction_id)
        .bind(world_id)
        .execute(&self.pool)
        .await?;
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
        sqlx::query(
            "insert into outfit_names (id, alias, name, faction_id, world_id) \
             values ($1, $2, $3, $4, $5) \
             on conflict (id) do update set \
             alias = excluded.alias, \
             name = excluded.name, \
             faction_id = excluded.faction_id, \
             world_id = excluded.world_id",
        )
        .bind(outfit_id)
        .bind(alias)
        .bind(name)
        .bind(faction_id)
        .bind(world_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_character_outfit(
        &self,
        character_id: CharacterId,
        outfit_id: OutfitId,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "insert into character_outfit (character_id, outfit_id, updated_at_ms) \
             values ($1, $2, $3) \
             on conflict (character_id) do update set \
             outfit_id = excluded.outfit_id, \
             updated_at_ms = excluded.updated_at_ms",
        )
        .bind(character_id)
        .bind(outfit_id)
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
