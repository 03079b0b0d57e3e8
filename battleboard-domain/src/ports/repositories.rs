use std::collections::HashSet;

use async_trait::async_trait;

use crate::entities::{
    BattleCommit,
    BattleQueueItem,
    BattleRecord,
    BattleReport,
    KillRecord,
    NewQueueItem,
};
use crate::errors::StoreResult;
use crate::value_objects::QueueStatus;

#[async_trait]
pub trait KillEventRepository: Send + Sync {
    async fn recent_event_ids(&self, limit: usize) -> StoreResult<HashSet<i64>>;
    /// Returns how many rows were actually inserted.
    async fn insert_kills(&self, kills: &[KillRecord]) -> StoreResult<usize>;
    async fn delete_kills_before(&self, cutoff_ms: i64) -> StoreResult<usize>;
    async fn list_kills(&self, search: Option<&str>, limit: usize) -> StoreResult<Vec<KillRecord>>;
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait BattleQueueRepository: Send + Sync {
    async fn latest_battle_id(&self) -> StoreResult<Option<i64>>;
    async fn existing_battle_ids(&self, battle_ids: &[i64]) -> StoreResult<HashSet<i64>>;
    async fn enqueue(&self, items: &[NewQueueItem]) -> StoreResult<usize>;
    async fn select_pending(&self, limit: usize) -> StoreResult<Vec<BattleQueueItem>>;
    async fn get_item(&self, queue_id: i64) -> StoreResult<Option<BattleQueueItem>>;
    async fn mark_status(&self, queue_id: i64, status: QueueStatus) -> StoreResult<()>;
    async fn list_items(
        &self,
        status: Option<QueueStatus>,
        limit: usize,
    ) -> StoreResult<Vec<BattleQueueItem>>;
}

#[async_trait]
pub trait BattleRepository: Send + Sync {
    /// Battle, rollups, kill list and the queue transition to processed,
    /// all or nothing. A battle id that is already stored fails with
    /// `StoreError::DuplicateBattle`.
    async fn commit_battle(&self, commit: &BattleCommit) -> StoreResult<()>;
    async fn list_battles(&self, limit: usize) -> StoreResult<Vec<BattleRecord>>;
    async fn get_battle(&self, battle_id: i64) -> StoreResult<Option<BattleReport>>;
}
