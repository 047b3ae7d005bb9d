//! Postgres 在线名单实现

use crate::error::StorageError;
use crate::traits::OnlineStore;
use domain::CharacterId;
use sqlx::PgPool;

pub struct PgOnlineStore {
    pub pool: PgPool,
}

impl PgOnlineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OnlineStore for PgOnlineStore {
    async fn clear_online_set(&self) -> Result<(), StorageError> {
        sqlx::query("delete from online_players")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn online_add(&self, character_id: CharacterId) -> Result<(), StorageError> {
        sqlx::query(
            "insert into online_players (character_id) values ($1) \
             on conflict do nothing",
        )
        .bind(character_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn online_remove(&self, character_id: CharacterId) -> Result<(), StorageError> {
        sqlx::query("delete from online_players where character_id = $1")
            .bind(character_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
