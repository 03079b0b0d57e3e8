use async_trait::async_trait;

use crate::entities::{BattleDetail, BattleRecord, KillEvent, RuntimeConfig};
use crate::errors::FetchError;

#[async_trait]
pub trait TelemetryApi: Send + Sync {
    async fn fetch_battles(&self, offset: usize, limit: usize) -> Result<Vec<BattleDetail>, FetchError>;
    async fn fetch_battle(&self, battle_id: i64) -> Result<BattleDetail, FetchError>;
    async fn fetch_battle_kills(
        &self,
        battle_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KillEvent>, FetchError>;
    /// `cache_token` is sent as the `guid` parameter so every page of one
    /// poll cycle shares it.
    async fn fetch_kill_events(
        &self,
        offset: usize,
        limit: usize,
        cache_token: &str,
    ) -> Result<Vec<KillEvent>, FetchError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn spawn_battle_notice(&self, config: RuntimeConfig, battle: BattleRecord);
    async fn check_target(&self, config: &RuntimeConfig) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_database(&self) -> anyhow::Result<bool>;
    async fn check_notification_target(&self) -> anyhow::Result<bool>;
}
