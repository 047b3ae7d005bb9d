//! 军团批量解析器。
//!
//! 对到来的每个角色 id：批内去重、查缓存新鲜度，未命中才进入
//! 累积批次；攒够阈值后对整批发起一次 Census 查询并回写存储。
//! 连接重置类查询失败丢弃当前批次继续运行，其余失败致命。

use crate::ConsumeError;
use domain::{CharacterId, PlayerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracker_census::CharacterResolver;
use tracker_storage::RosterStore;
use tracker_telemetry::{
    record_batch_discarded, record_batch_lookup, record_cache_hit, record_characters_resolved,
    record_duplicate_skipped,
};
use tracing::{info, warn};

pub struct OutfitBatcher {
    roster: Arc<dyn RosterStore>,
    resolver: Arc<dyn CharacterResolver>,
    batch_size: usize,
    freshness_window_ms: i64,
    // 累积批次只属于本任务，绝不跨任务共享
    pending: Vec<CharacterId>,
}

impl OutfitBatcher {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        resolver: Arc<dyn CharacterResolver>,
        batch_size: usize,
        freshness_window_ms: i64,
    ) -> Self {
        Self {
            roster,
            resolver,
            batch_size: batch_size.max(1),
            freshness_window_ms,
            pending: Vec::new(),
        }
    }

    /// 让一个角色 id 进入批处理。`now_ms` 由调用方提供，新鲜度
    /// 判断因此可以在测试里用固定时钟复现。
    pub async fn offer(
        &mut self,
        character_id: CharacterId,
        now_ms: i64,
    ) -> Result<(), ConsumeError> {
        if self.pending.contains(&character_id) {
            record_duplicate_skipped();
            return Ok(());
        }

        if let Some(entry) = self.roster.lookup_outfit_cache(character_id).await? {
            if now_ms - entry.updated_at_ms < self.freshness_window_ms {
                record_cache_hit();
                return Ok(());
            }
        }

        self.pending.push(character_id);
        if self.pending.len() < self.batch_size {
            return Ok(());
        }
        self.resolve_pending(now_ms).await
    }

    /// 对当前批次发起一次查询。无论结果如何，累积批次都已清空。
    async fn resolve_pending(&mut self, now_ms: i64) -> Result<(), ConsumeError> {
        let batch = std::mem::take(&mut self.pending);
        record_batch_lookup();
        info!(target: "tracker.batcher", batch = batch.len(), "resolving outfit batch");

        let characters = match self.resolver.resolve_characters(&batch).await {
            Ok(characters) => characters,
            Err(err) if err.is_connection_reset() => {
                // 连接重置不重试：整批丢弃，继续接收新 id
                record_batch_discarded();
                warn!(
                    target: "tracker.batcher",
                    error = %err,
                    dropped = batch.len(),
                    "enrichment reset, dropping batch"
                );
                return Ok(());
            }
            Err(err) => return Err(ConsumeError::Enrichment(err)),
        };
        record_characters_resolved(characters.len() as u64);

        // 响应里缺席的角色不写任何行，下次再出现时重试
        for character in &characters {
            self.roster
                .upsert_character(
                    character.character_id,
                    &character.name,
                    character.faction_id,
                    character.world_id,
                )
                .await?;
        }
        for character in &characters {
            if let Some(outfit) = &character.outfit {
                self.roster
                    .upsert_outfit(
                        outfit.outfit_id,
                        &outfit.alias,
                        &outfit.name,
                        outfit.faction_id,
                        outfit.world_id,
                    )
                    .await?;
            }
        }
        for character in &characters {
            let outfit_id = character
                .outfit
                .as_ref()
                .map(|outfit| outfit.outfit_id)
                .unwrap_or(0);
            self.roster
                .upsert_character_outfit(character.character_id, outfit_id, now_ms)
                .await?;
        }
        Ok(())
    }

    /// 批处理循环。事件队列关闭时结束，残留的未满批次不再发起查询。
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PlayerEvent>,
    ) -> Result<(), ConsumeError> {
        while let Some(event) = events.recv().await {
            self.offer(event.character_id, now_epoch_ms()).await?;
        }
        info!(target: "tracker.batcher", "event queue closed, batcher stopping");
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CharacterRecord, OutfitRecord};
    use std::sync::Mutex;
    use tracker_census::CensusError;
    use tracker_storage::{InMemoryTrackerStore, RosterStore};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    const WINDOW_MS: i64 = 2 * DAY_MS;

    /// 记录每次调用并按预设脚本应答的假解析器。
    struct FakeResolver {
        calls: Mutex<Vec<Vec<CharacterId>>>,
        script: Mutex<Vec<Result<Vec<CharacterRecord>, CensusError>>>,
    }

    impl FakeResolver {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(Vec::new()),
            }
        }

        fn push_response(&self, response: Result<Vec<CharacterRecord>, CensusError>) {
            self.script.lock().expect("lock").push(response);
        }

        fn calls(&self) -> Vec<Vec<CharacterId>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait::async_trait]
    impl CharacterResolver for FakeResolver {
        async fn resolve_characters(
            &self,
            character_ids: &[CharacterId],
        ) -> Result<Vec<CharacterRecord>, CensusError> {
            self.calls
                .lock()
                .expect("lock")
                .push(character_ids.to_vec());
            let mut script = self.script.lock().expect("lock");
            if script.is_empty() {
                return Ok(Vec::new());
            }
            script.remove(0)
        }
    }

    fn record(character_id: CharacterId, outfit_id: i64) -> CharacterRecord {
        CharacterRecord {
            character_id,
            name: format!("char-{}", character_id),
            faction_id: 1,
            world_id: 1,
            outfit: (outfit_id != 0).then(|| OutfitRecord {
                outfit_id,
                alias: "UNIT".to_string(),
                name: "First Unit".to_string(),
                faction_id: 1,
                world_id: 1,
                leader_character_id: character_id,
                member_count: 10,
                created_at: 1_325_394_000,
            }),
        }
    }

    fn batcher(
        store: &Arc<InMemoryTrackerStore>,
        resolver: &Arc<FakeResolver>,
        batch_size: usize,
    ) -> OutfitBatcher {
        OutfitBatcher::new(store.clone(), resolver.clone(), batch_size, WINDOW_MS)
    }

    #[tokio::test]
    async fn no_call_below_threshold() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        let mut batcher = batcher(&store, &resolver, 3);

        batcher.offer(1, 0).await.expect("offer");
        batcher.offer(2, 0).await.expect("offer");
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn exactly_one_call_per_forty_distinct_cache_misses() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        let mut batcher = batcher(&store, &resolver, 40);

        for id in 1..=40 {
            batcher.offer(id, 0).await.expect("offer");
        }

        let calls = resolver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (1..=40).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn duplicates_within_batch_do_not_count() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 0).await.expect("offer");
        batcher.offer(1, 0).await.expect("duplicate");
        assert!(resolver.calls().is_empty());

        batcher.offer(2, 0).await.expect("offer");
        let calls = resolver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![1, 2]);
    }

    #[tokio::test]
    async fn fresh_cache_entry_is_skipped() {
        let store = Arc::new(InMemoryTrackerStore::new());
        store
            .upsert_character_outfit(1, 99, 1_000)
            .await
            .expect("seed cache");
        let resolver = Arc::new(FakeResolver::new());
        let mut batcher = batcher(&store, &resolver, 2);

        // 窗口内：跳过，不计入批次
        batcher.offer(1, 1_000 + WINDOW_MS - 1).await.expect("offer");
        batcher.offer(2, 1_000).await.expect("offer");
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_cache_entry_is_requeried() {
        let store = Arc::new(InMemoryTrackerStore::new());
        store
            .upsert_character_outfit(1, 99, 1_000)
            .await
            .expect("seed cache");
        let resolver = Arc::new(FakeResolver::new());
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 1_000 + WINDOW_MS).await.expect("offer");
        batcher.offer(2, 1_000 + WINDOW_MS).await.expect("offer");
        let calls = resolver.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![1, 2]);
    }

    #[tokio::test]
    async fn successful_batch_writes_all_rows() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        resolver.push_response(Ok(vec![record(1, 100), record(2, 0)]));
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 5_000).await.expect("offer");
        batcher.offer(2, 5_000).await.expect("offer");

        assert!(store.has_character(1));
        assert!(store.has_character(2));
        assert!(store.has_outfit(100));

        let member = store
            .lookup_outfit_cache(1)
            .await
            .expect("lookup")
            .expect("entry");
        assert_eq!(member.outfit_id, 100);
        assert_eq!(member.updated_at_ms, 5_000);

        // 无军团角色也占据新鲜度窗口，outfit_id 记为 0
        let outfitless = store
            .lookup_outfit_cache(2)
            .await
            .expect("lookup")
            .expect("entry");
        assert_eq!(outfitless.outfit_id, 0);
    }

    #[tokio::test]
    async fn omitted_records_are_not_written() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        // 角色 2 被 API 省略（例如隐私受限）
        resolver.push_response(Ok(vec![record(1, 0)]));
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 0).await.expect("offer");
        batcher.offer(2, 0).await.expect("offer");

        assert!(store.has_character(1));
        assert!(!store.has_character(2));
        assert!(store.lookup_outfit_cache(2).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn connection_reset_discards_batch_and_continues() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        resolver.push_response(Err(CensusError::Request(
            "error sending request: connection reset by peer".to_string(),
        )));
        resolver.push_response(Ok(vec![record(3, 0), record(4, 0)]));
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 0).await.expect("offer");
        batcher.offer(2, 0).await.expect("reset swallowed");
        // 整批被丢弃，没有任何落库
        assert!(!store.has_character(1));
        assert!(!store.has_character(2));

        // 管线继续接收新 id，攒满后照常发起下一次查询
        batcher.offer(3, 0).await.expect("offer");
        batcher.offer(4, 0).await.expect("offer");
        let calls = resolver.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec![3, 4]);
        assert!(store.has_character(3));
    }

    #[tokio::test]
    async fn other_enrichment_errors_escalate() {
        let store = Arc::new(InMemoryTrackerStore::new());
        let resolver = Arc::new(FakeResolver::new());
        resolver.push_response(Err(CensusError::Status(503)));
        let mut batcher = batcher(&store, &resolver, 2);

        batcher.offer(1, 0).await.expect("offer");
        let err = batcher.offer(2, 0).await.expect_err("fatal");
        assert!(matches!(err, ConsumeError::Enrichment(_)));
    }
}
