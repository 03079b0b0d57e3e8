// In-memory fakes for command tests

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use battleboard_domain::ports::{
    BattleQueueRepository,
    BattleRepository,
    HealthCheckService,
    KillEventRepository,
    NotificationSink,
    TelemetryApi,
};
use battleboard_domain::{
    BattleCommit,
    BattleDetail,
    BattleQueueItem,
    BattleRecord,
    BattleReport,
    FetchError,
    KillEvent,
    KillRecord,
    NewQueueItem,
    PlayerSnapshot,
    QueueStatus,
    RuntimeConfig,
    StoreError,
    StoreResult,
};

use crate::{AppState, InFlight, Metrics};

#[derive(Default)]
pub struct MemoryStore {
    pub kills: Mutex<BTreeMap<i64, KillRecord>>,
    pub queue: Mutex<Vec<BattleQueueItem>>,
    pub battles: Mutex<HashMap<i64, BattleCommit>>,
    pub status_writes: Mutex<Vec<(i64, QueueStatus)>>,
    pub fail_inserts: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_failed_mark: AtomicBool,
}

impl MemoryStore {
    pub fn seed_kill(&self, event_id: i64, timestamp: i64) {
        self.kills.lock().unwrap().insert(
            event_id,
            KillRecord {
                event_id,
                timestamp,
                ..KillRecord::default()
            },
        );
    }

    pub fn seed_queue(&self, battle_id: i64, status: QueueStatus, start_time: i64) -> i64 {
        let mut queue = self.queue.lock().unwrap();
        let queue_id = queue.len() as i64 + 1;
        queue.push(BattleQueueItem {
            queue_id,
            battle_id,
            region: "americas".to_string(),
            status,
            start_time,
            updated_at: 0,
        });
        queue_id
    }

    pub fn status_of(&self, queue_id: i64) -> Option<QueueStatus> {
        self.queue
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.queue_id == queue_id)
            .map(|item| item.status)
    }

    pub fn queued_battle_ids(&self) -> Vec<i64> {
        self.queue.lock().unwrap().iter().map(|item| item.battle_id).collect()
    }
}

#[async_trait]
impl KillEventRepository for MemoryStore {
    async fn recent_event_ids(&self, limit: usize) -> StoreResult<HashSet<i64>> {
        let kills = self.kills.lock().unwrap();
        let mut rows: Vec<&KillRecord> = kills.values().collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows.into_iter().take(limit).map(|row| row.event_id).collect())
    }

    async fn insert_kills(&self, kills: &[KillRecord]) -> StoreResult<usize> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        let mut stored = self.kills.lock().unwrap();
        let mut inserted = 0;
        for kill in kills {
            if !stored.contains_key(&kill.event_id) {
                stored.insert(kill.event_id, kill.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn delete_kills_before(&self, cutoff_ms: i64) -> StoreResult<usize> {
        let mut stored = self.kills.lock().unwrap();
        let before = stored.len();
        stored.retain(|_, kill| kill.timestamp >= cutoff_ms);
        Ok(before - stored.len())
    }

    async fn list_kills(&self, search: Option<&str>, limit: usize) -> StoreResult<Vec<KillRecord>> {
        let stored = self.kills.lock().unwrap();
        let needle = search.map(|s| s.to_lowercase());
        let mut rows: Vec<KillRecord> = stored
            .values()
            .filter(|kill| match &needle {
                Some(n) => kill.killer_name.to_lowercase().starts_with(n)
                    || kill.victim_name.to_lowercase().starts_with(n),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BattleQueueRepository for MemoryStore {
    async fn latest_battle_id(&self) -> StoreResult<Option<i64>> {
        Ok(self
            .queue
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|item| item.start_time)
            .map(|item| item.battle_id))
    }

    async fn existing_battle_ids(&self, battle_ids: &[i64]) -> StoreResult<HashSet<i64>> {
        let queue = self.queue.lock().unwrap();
        Ok(queue
            .iter()
            .map(|item| item.battle_id)
            .filter(|id| battle_ids.contains(id))
            .collect())
    }

    async fn enqueue(&self, items: &[NewQueueItem]) -> StoreResult<usize> {
        for item in items {
            self.seed_queue(item.battle_id, QueueStatus::Queued, item.start_time);
        }
        Ok(items.len())
    }

    async fn select_pending(&self, limit: usize) -> StoreResult<Vec<BattleQueueItem>> {
        let mut items: Vec<BattleQueueItem> = self
            .queue
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.status.is_pending())
            .cloned()
            .collect();
        items.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        items.truncate(limit);
        Ok(items)
    }

    async fn get_item(&self, queue_id: i64) -> StoreResult<Option<BattleQueueItem>> {
        Ok(self
            .queue
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.queue_id == queue_id)
            .cloned())
    }

    async fn mark_status(&self, queue_id: i64, status: QueueStatus) -> StoreResult<()> {
        if status == QueueStatus::Failed && self.fail_failed_mark.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("database is locked".to_string()));
        }
        self.status_writes.lock().unwrap().push((queue_id, status));
        let mut queue = self.queue.lock().unwrap();
        match queue.iter_mut().find(|item| item.queue_id == queue_id) {
            Some(item) => {
                item.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("queue item {queue_id}"))),
        }
    }

    async fn list_items(
        &self,
        status: Option<QueueStatus>,
        limit: usize,
    ) -> StoreResult<Vec<BattleQueueItem>> {
        let queue = self.queue.lock().unwrap();
        Ok(queue
            .iter()
            .filter(|item| status.map(|s| s == item.status).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BattleRepository for MemoryStore {
    async fn commit_battle(&self, commit: &BattleCommit) -> StoreResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk I/O error".to_string()));
        }
        let mut battles = self.battles.lock().unwrap();
        if battles.contains_key(&commit.battle.battle_id) {
            return Err(StoreError::DuplicateBattle(commit.battle.battle_id));
        }
        battles.insert(commit.battle.battle_id, commit.clone());
        drop(battles);
        let mut queue = self.queue.lock().unwrap();
        if let Some(item) = queue.iter_mut().find(|item| item.queue_id == commit.queue_id) {
            item.status = QueueStatus::Processed;
        }
        Ok(())
    }

    async fn list_battles(&self, limit: usize) -> StoreResult<Vec<BattleRecord>> {
        let battles = self.battles.lock().unwrap();
        let mut rows: Vec<BattleRecord> = battles.values().map(|c| c.battle.clone()).collect();
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn get_battle(&self, battle_id: i64) -> StoreResult<Option<BattleReport>> {
        Ok(self.battles.lock().unwrap().get(&battle_id).map(|c| BattleReport {
            battle: c.battle.clone(),
            alliances: c.alliances.clone(),
            guilds: c.guilds.clone(),
            players: c.players.clone(),
        }))
    }
}

#[derive(Default)]
pub struct ScriptedApi {
    pub kill_pages: Mutex<VecDeque<Result<Vec<KillEvent>, FetchError>>>,
    pub kill_calls: Mutex<Vec<(usize, usize, String)>>,
    pub battle_list: Mutex<Vec<BattleDetail>>,
    pub battle_list_calls: Mutex<Vec<(usize, usize)>>,
    pub battle_details: Mutex<HashMap<i64, BattleDetail>>,
    pub battle_kills: Mutex<HashMap<i64, Vec<KillEvent>>>,
    pub battle_kill_calls: Mutex<Vec<(i64, usize, usize)>>,
    pub failing_battles: Mutex<HashSet<i64>>,
}

impl ScriptedApi {
    pub fn push_kill_page(&self, page: Vec<KillEvent>) {
        self.kill_pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_kill_error(&self, err: FetchError) {
        self.kill_pages.lock().unwrap().push_back(Err(err));
    }

    pub fn add_battle(&self, battle: BattleDetail, kills: Vec<KillEvent>) {
        self.battle_kills.lock().unwrap().insert(battle.id, kills);
        self.battle_details.lock().unwrap().insert(battle.id, battle);
    }
}

#[async_trait]
impl TelemetryApi for ScriptedApi {
    async fn fetch_battles(&self, offset: usize, limit: usize) -> Result<Vec<BattleDetail>, FetchError> {
        self.battle_list_calls.lock().unwrap().push((offset, limit));
        let list = self.battle_list.lock().unwrap();
        Ok(list.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_battle(&self, battle_id: i64) -> Result<BattleDetail, FetchError> {
        if self.failing_battles.lock().unwrap().contains(&battle_id) {
            return Err(FetchError::Exhausted {
                attempts: 3,
                last: Box::new(FetchError::Status {
                    url: format!("/battles/{battle_id}"),
                    status: 504,
                    body: "gateway timeout".to_string(),
                }),
            });
        }
        self.battle_details
            .lock()
            .unwrap()
            .get(&battle_id)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: format!("/battles/{battle_id}"),
                status: 404,
                body: String::new(),
            })
    }

    async fn fetch_battle_kills(
        &self,
        battle_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KillEvent>, FetchError> {
        self.battle_kill_calls.lock().unwrap().push((battle_id, offset, limit));
        let kills = self.battle_kills.lock().unwrap();
        Ok(kills
            .get(&battle_id)
            .map(|all| all.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_kill_events(
        &self,
        offset: usize,
        limit: usize,
        cache_token: &str,
    ) -> Result<Vec<KillEvent>, FetchError> {
        self.kill_calls
            .lock()
            .unwrap()
            .push((offset, limit, cache_token.to_string()));
        self.kill_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<BattleRecord>>,
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn spawn_battle_notice(&self, _config: RuntimeConfig, battle: BattleRecord) {
        self.notices.lock().unwrap().push(battle);
    }

    async fn check_target(&self, _config: &RuntimeConfig) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct AlwaysHealthy;

#[async_trait]
impl HealthCheckService for AlwaysHealthy {
    async fn check_database(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn check_notification_target(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

pub struct Harness {
    pub state: AppState,
    pub api: Arc<ScriptedApi>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(config: RuntimeConfig) -> Harness {
    let api = Arc::new(ScriptedApi::default());
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        config,
        api: api.clone(),
        kill_repo: store.clone(),
        queue_repo: store.clone(),
        battle_repo: store.clone(),
        notifier: notifier.clone(),
        health: Arc::new(AlwaysHealthy),
        metrics: Arc::new(Metrics::default()),
        in_flight: Arc::new(InFlight::default()),
    };
    Harness {
        state,
        api,
        store,
        notifier,
    }
}

pub fn kill_event(event_id: i64) -> KillEvent {
    KillEvent {
        event_id,
        timestamp: Utc.timestamp_millis_opt(1_714_557_600_000 + event_id).unwrap(),
        killer: snapshot("Killer", "A", "GA"),
        victim: snapshot("Victim", "B", "GB"),
        total_victim_kill_fame: 1000,
        ..KillEvent::default()
    }
}

pub fn snapshot(name: &str, alliance: &str, guild: &str) -> PlayerSnapshot {
    PlayerSnapshot {
        id: format!("id-{name}"),
        name: name.to_string(),
        alliance_name: alliance.to_string(),
        guild_name: guild.to_string(),
        ..PlayerSnapshot::default()
    }
}

pub fn battle(id: i64, start_ms: i64) -> BattleDetail {
    BattleDetail {
        id,
        start_time: Utc.timestamp_millis_opt(start_ms).unwrap(),
        end_time: Utc.timestamp_millis_opt(start_ms + 600_000).unwrap(),
        ..BattleDetail::default()
    }
}
