use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;

use battleboard_domain::{
    current_millis, AllianceRollup, BattleCommit, BattleQueueItem, BattleQueueRepository,
    BattleRecord, BattleReport, BattleRepository, GuildRollup, KillEventRepository, KillRecord,
    NewQueueItem, PlayerRollup, QueueStatus, StoreError, StoreResult,
};

// SQLite's default host parameter limit is 999
const ID_CHUNK: usize = 500;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kills (
    event_id INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL,
    battle_id INTEGER NOT NULL,
    killer_name TEXT NOT NULL,
    killer_guild TEXT NOT NULL,
    killer_alliance TEXT NOT NULL,
    killer_weapon TEXT NOT NULL,
    killer_ip REAL NOT NULL,
    victim_name TEXT NOT NULL,
    victim_guild TEXT NOT NULL,
    victim_alliance TEXT NOT NULL,
    victim_weapon TEXT NOT NULL,
    victim_ip REAL NOT NULL,
    participant_count INTEGER NOT NULL,
    fame INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_kills_timestamp ON kills(timestamp);

CREATE TABLE IF NOT EXISTS battle_queue (
    queue_id INTEGER PRIMARY KEY AUTOINCREMENT,
    battle_id INTEGER NOT NULL,
    region TEXT NOT NULL,
    status TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_battle_queue_battle ON battle_queue(battle_id);
CREATE INDEX IF NOT EXISTS idx_battle_queue_status ON battle_queue(status, start_time);

CREATE TABLE IF NOT EXISTS battles (
    battle_id INTEGER PRIMARY KEY,
    region TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    total_fame INTEGER NOT NULL,
    total_kills INTEGER NOT NULL,
    total_players INTEGER NOT NULL,
    top_alliances TEXT NOT NULL,
    top_guilds TEXT NOT NULL,
    processed_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_battles_start ON battles(start_time);

CREATE TABLE IF NOT EXISTS battle_alliances (
    battle_id INTEGER NOT NULL,
    alliance_id TEXT NOT NULL,
    name TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    players INTEGER NOT NULL,
    kills INTEGER NOT NULL,
    kill_fame INTEGER NOT NULL,
    deaths INTEGER NOT NULL,
    death_fame INTEGER NOT NULL,
    average_ip REAL NOT NULL,
    PRIMARY KEY (battle_id, alliance_id)
);

CREATE TABLE IF NOT EXISTS battle_guilds (
    battle_id INTEGER NOT NULL,
    guild_id TEXT NOT NULL,
    name TEXT NOT NULL,
    alliance_id TEXT NOT NULL,
    alliance_name TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    players INTEGER NOT NULL,
    kills INTEGER NOT NULL,
    kill_fame INTEGER NOT NULL,
    deaths INTEGER NOT NULL,
    death_fame INTEGER NOT NULL,
    average_ip REAL NOT NULL,
    PRIMARY KEY (battle_id, guild_id)
);

CREATE TABLE IF NOT EXISTS battle_players (
    battle_id INTEGER NOT NULL,
    player_id TEXT NOT NULL,
    name TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    alliance_id TEXT NOT NULL,
    alliance_name TEXT NOT NULL,
    guild_id TEXT NOT NULL,
    guild_name TEXT NOT NULL,
    kills INTEGER NOT NULL,
    kill_fame INTEGER NOT NULL,
    deaths INTEGER NOT NULL,
    death_fame INTEGER NOT NULL,
    weapon TEXT NOT NULL,
    average_ip REAL NOT NULL,
    damage REAL NOT NULL,
    healing REAL NOT NULL,
    battle_players INTEGER NOT NULL,
    PRIMARY KEY (battle_id, name)
);

CREATE TABLE IF NOT EXISTS battle_kills (
    battle_id INTEGER NOT NULL,
    event_id INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    killer_name TEXT NOT NULL,
    killer_guild TEXT NOT NULL,
    killer_alliance TEXT NOT NULL,
    killer_weapon TEXT NOT NULL,
    killer_ip REAL NOT NULL,
    victim_name TEXT NOT NULL,
    victim_guild TEXT NOT NULL,
    victim_alliance TEXT NOT NULL,
    victim_weapon TEXT NOT NULL,
    victim_ip REAL NOT NULL,
    participant_count INTEGER NOT NULL,
    fame INTEGER NOT NULL,
    PRIMARY KEY (battle_id, event_id)
);
"#;

const KILL_COLUMNS: &str = "event_id, timestamp, battle_id, killer_name, killer_guild, \
     killer_alliance, killer_weapon, killer_ip, victim_name, victim_guild, victim_alliance, \
     victim_weapon, victim_ip, participant_count, fame";

const QUEUE_COLUMNS: &str = "queue_id, battle_id, region, status, start_time, updated_at";

const BATTLE_COLUMNS: &str = "battle_id, region, start_time, end_time, total_fame, total_kills, \
     total_players, top_alliances, top_guilds, processed_at";

#[derive(Clone)]
pub struct SqliteRepo {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepo {
    pub fn open(path: &str) -> StoreResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StoreError::Backend(format!("create {}: {}", parent.display(), err))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(db_err)?;
        debug!(path, journal_mode = %journal_mode, "opened database");
        Self::with_connection(conn)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Backend(format!("blocking task failed: {}", err)))?
    }
}

fn db_err(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

fn unique_err(table: &str) -> impl Fn(rusqlite::Error) -> StoreError + '_ {
    move |err| {
        if is_constraint(&err) {
            StoreError::UniqueViolation(format!("{}: {}", table, err))
        } else {
            db_err(err)
        }
    }
}

fn like_prefix(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 1);
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn kill_from_row(row: &Row<'_>) -> rusqlite::Result<KillRecord> {
    Ok(KillRecord {
        event_id: row.get(0)?,
        timestamp: row.get(1)?,
        battle_id: row.get(2)?,
        killer_name: row.get(3)?,
        killer_guild: row.get(4)?,
        killer_alliance: row.get(5)?,
        killer_weapon: row.get(6)?,
        killer_ip: row.get(7)?,
        victim_name: row.get(8)?,
        victim_guild: row.get(9)?,
        victim_alliance: row.get(10)?,
        victim_weapon: row.get(11)?,
        victim_ip: row.get(12)?,
        participant_count: row.get(13)?,
        fame: row.get(14)?,
    })
}

fn queue_item_from_row(row: &Row<'_>) -> rusqlite::Result<BattleQueueItem> {
    let raw: String = row.get(3)?;
    let status = QueueStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown queue status {}", raw).into(),
        )
    })?;
    Ok(BattleQueueItem {
        queue_id: row.get(0)?,
        battle_id: row.get(1)?,
        region: row.get(2)?,
        status,
        start_time: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn battle_from_row(row: &Row<'_>) -> rusqlite::Result<BattleRecord> {
    Ok(BattleRecord {
        battle_id: row.get(0)?,
        region: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        total_fame: row.get(4)?,
        total_kills: row.get(5)?,
        total_players: row.get(6)?,
        top_alliances: row.get(7)?,
        top_guilds: row.get(8)?,
        processed_at: row.get(9)?,
    })
}

fn insert_battle_rows(conn: &mut Connection, commit: &BattleCommit) -> StoreResult<()> {
    let tx = conn.transaction().map_err(db_err)?;
    let battle = &commit.battle;

    tx.execute(
        &format!(
            "INSERT INTO battles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            BATTLE_COLUMNS
        ),
        params![
            battle.battle_id,
            battle.region,
            battle.start_time,
            battle.end_time,
            battle.total_fame,
            battle.total_kills,
            battle.total_players,
            battle.top_alliances,
            battle.top_guilds,
            battle.processed_at,
        ],
    )
    .map_err(|err| {
        if is_constraint(&err) {
            StoreError::DuplicateBattle(battle.battle_id)
        } else {
            db_err(err)
        }
    })?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO battle_alliances (battle_id, alliance_id, name, start_time, players, \
                 kills, kill_fame, deaths, death_fame, average_ip) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .map_err(db_err)?;
        for row in &commit.alliances {
            stmt.execute(params![
                battle.battle_id,
                row.alliance_id,
                row.name,
                row.start_time,
                row.players,
                row.kills,
                row.kill_fame,
                row.deaths,
                row.death_fame,
                row.average_ip,
            ])
            .map_err(unique_err("battle_alliances"))?;
        }
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO battle_guilds (battle_id, guild_id, name, alliance_id, alliance_name, \
                 start_time, players, kills, kill_fame, deaths, death_fame, average_ip) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )
            .map_err(db_err)?;
        for row in &commit.guilds {
            stmt.execute(params![
                battle.battle_id,
                row.guild_id,
                row.name,
                row.alliance_id,
                row.alliance_name,
                row.start_time,
                row.players,
                row.kills,
                row.kill_fame,
                row.deaths,
                row.death_fame,
                row.average_ip,
            ])
            .map_err(unique_err("battle_guilds"))?;
        }
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO battle_players (battle_id, player_id, name, start_time, alliance_id, \
                 alliance_name, guild_id, guild_name, kills, kill_fame, deaths, death_fame, weapon, \
                 average_ip, damage, healing, battle_players) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )
            .map_err(db_err)?;
        for row in &commit.players {
            stmt.execute(params![
                battle.battle_id,
                row.player_id,
                row.name,
                row.start_time,
                row.alliance_id,
                row.alliance_name,
                row.guild_id,
                row.guild_name,
                row.kills,
                row.kill_fame,
                row.deaths,
                row.death_fame,
                row.weapon,
                row.average_ip,
                row.damage,
                row.healing,
                row.battle_players,
            ])
            .map_err(unique_err("battle_players"))?;
        }
    }

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO battle_kills (battle_id, {}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                KILL_COLUMNS
            ))
            .map_err(db_err)?;
        for kill in &commit.kills {
            stmt.execute(params![
                battle.battle_id,
                kill.event_id,
                kill.timestamp,
                kill.battle_id,
                kill.killer_name,
                kill.killer_guild,
                kill.killer_alliance,
                kill.killer_weapon,
                kill.killer_ip,
                kill.victim_name,
                kill.victim_guild,
                kill.victim_alliance,
                kill.victim_weapon,
                kill.victim_ip,
                kill.participant_count,
                kill.fame,
            ])
            .map_err(unique_err("battle_kills"))?;
        }
    }

    tx.execute(
        "UPDATE battle_queue SET status = ?1, updated_at = ?2 WHERE queue_id = ?3",
        params![QueueStatus::Processed.as_str(), current_millis(), commit.queue_id],
    )
    .map_err(db_err)?;

    tx.commit().map_err(db_err)
}

#[async_trait]
impl KillEventRepository for SqliteRepo {
    async fn recent_event_ids(&self, limit: usize) -> StoreResult<HashSet<i64>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare("SELECT event_id FROM kills ORDER BY timestamp DESC LIMIT ?1")
                .map_err(db_err)?;
            let ids = stmt
                .query_map(params![limit as i64], |row| row.get::<_, i64>(0))
                .map_err(db_err)?
                .collect::<rusqlite::Result<HashSet<_>>>()
                .map_err(db_err)?;
            Ok(ids)
        })
        .await
    }

    async fn insert_kills(&self, kills: &[KillRecord]) -> StoreResult<usize> {
        let kills = kills.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(db_err)?;
            let mut inserted = 0usize;
            {
                let mut stmt = tx
                    .prepare(&format!(
                        "INSERT OR IGNORE INTO kills ({}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                        KILL_COLUMNS
                    ))
                    .map_err(db_err)?;
                for kill in &kills {
                    inserted += stmt
                        .execute(params![
                            kill.event_id,
                            kill.timestamp,
                            kill.battle_id,
                            kill.killer_name,
                            kill.killer_guild,
                            kill.killer_alliance,
                            kill.killer_weapon,
                            kill.killer_ip,
                            kill.victim_name,
                            kill.victim_guild,
                            kill.victim_alliance,
                            kill.victim_weapon,
                            kill.victim_ip,
                            kill.participant_count,
                            kill.fame,
                        ])
                        .map_err(db_err)?;
                }
            }
            tx.commit().map_err(db_err)?;
            Ok(inserted)
        })
        .await
    }

    async fn delete_kills_before(&self, cutoff_ms: i64) -> StoreResult<usize> {
        self.run(move |conn| {
            conn.execute("DELETE FROM kills WHERE timestamp < ?1", params![cutoff_ms])
                .map_err(db_err)
        })
        .await
    }

    async fn list_kills(&self, search: Option<&str>, limit: usize) -> StoreResult<Vec<KillRecord>> {
        let pattern = search.map(like_prefix);
        self.run(move |conn| {
            let limit = limit as i64;
            let rows = match pattern {
                Some(pattern) => {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {} FROM kills \
                             WHERE killer_name LIKE ?1 ESCAPE '\\' \
                                OR victim_name LIKE ?1 ESCAPE '\\' \
                                OR killer_guild LIKE ?1 ESCAPE '\\' \
                                OR victim_guild LIKE ?1 ESCAPE '\\' \
                                OR killer_alliance LIKE ?1 ESCAPE '\\' \
                                OR victim_alliance LIKE ?1 ESCAPE '\\' \
                             ORDER BY timestamp DESC, event_id DESC LIMIT ?2",
                            KILL_COLUMNS
                        ))
                        .map_err(db_err)?;
                    let rows = stmt
                        .query_map(params![pattern, limit], kill_from_row)
                        .map_err(db_err)?
                        .collect::<rusqlite::Result<Vec<_>>>();
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {} FROM kills ORDER BY timestamp DESC, event_id DESC LIMIT ?1",
                            KILL_COLUMNS
                        ))
                        .map_err(db_err)?;
                    let rows = stmt
                        .query_map(params![limit], kill_from_row)
                        .map_err(db_err)?
                        .collect::<rusqlite::Result<Vec<_>>>();
                    rows
                }
            };
            rows.map_err(db_err)
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(db_err)
        })
        .await
    }
}

#[async_trait]
impl BattleQueueRepository for SqliteRepo {
    async fn latest_battle_id(&self) -> StoreResult<Option<i64>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT battle_id FROM battle_queue ORDER BY start_time DESC, battle_id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
        })
        .await
    }

    async fn existing_battle_ids(&self, battle_ids: &[i64]) -> StoreResult<HashSet<i64>> {
        let battle_ids = battle_ids.to_vec();
        self.run(move |conn| {
            let mut found = HashSet::new();
            for chunk in battle_ids.chunks(ID_CHUNK) {
                let placeholders = vec!["?"; chunk.len()].join(", ");
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT DISTINCT battle_id FROM battle_queue WHERE battle_id IN ({})",
                        placeholders
                    ))
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, i64>(0))
                    .map_err(db_err)?;
                for id in rows {
                    found.insert(id.map_err(db_err)?);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn enqueue(&self, items: &[NewQueueItem]) -> StoreResult<usize> {
        let items = items.to_vec();
        self.run(move |conn| {
            let now = current_millis();
            let tx = conn.transaction().map_err(db_err)?;
            let mut inserted = 0usize;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO battle_queue (battle_id, region, status, start_time, updated_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .map_err(db_err)?;
                for item in &items {
                    inserted += stmt
                        .execute(params![
                            item.battle_id,
                            item.region,
                            QueueStatus::Queued.as_str(),
                            item.start_time,
                            now,
                        ])
                        .map_err(db_err)?;
                }
            }
            tx.commit().map_err(db_err)?;
            Ok(inserted)
        })
        .await
    }

    async fn select_pending(&self, limit: usize) -> StoreResult<Vec<BattleQueueItem>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM battle_queue WHERE status IN (?1, ?2) \
                     ORDER BY start_time DESC, queue_id DESC LIMIT ?3",
                    QUEUE_COLUMNS
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(
                    params![
                        QueueStatus::Queued.as_str(),
                        QueueStatus::Failed.as_str(),
                        limit as i64
                    ],
                    queue_item_from_row,
                )
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows.map_err(db_err)
        })
        .await
    }

    async fn get_item(&self, queue_id: i64) -> StoreResult<Option<BattleQueueItem>> {
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM battle_queue WHERE queue_id = ?1", QUEUE_COLUMNS),
                params![queue_id],
                queue_item_from_row,
            )
            .optional()
            .map_err(db_err)
        })
        .await
    }

    async fn mark_status(&self, queue_id: i64, status: QueueStatus) -> StoreResult<()> {
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE battle_queue SET status = ?1, updated_at = ?2 WHERE queue_id = ?3",
                    params![status.as_str(), current_millis(), queue_id],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("queue item {}", queue_id)));
            }
            Ok(())
        })
        .await
    }

    async fn list_items(
        &self,
        status: Option<QueueStatus>,
        limit: usize,
    ) -> StoreResult<Vec<BattleQueueItem>> {
        self.run(move |conn| {
            let limit = limit as i64;
            let rows = match status {
                Some(status) => {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {} FROM battle_queue WHERE status = ?1 \
                             ORDER BY start_time DESC, queue_id DESC LIMIT ?2",
                            QUEUE_COLUMNS
                        ))
                        .map_err(db_err)?;
                    let rows = stmt
                        .query_map(params![status.as_str(), limit], queue_item_from_row)
                        .map_err(db_err)?
                        .collect::<rusqlite::Result<Vec<_>>>();
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {} FROM battle_queue \
                             ORDER BY start_time DESC, queue_id DESC LIMIT ?1",
                            QUEUE_COLUMNS
                        ))
                        .map_err(db_err)?;
                    let rows = stmt
                        .query_map(params![limit], queue_item_from_row)
                        .map_err(db_err)?
                        .collect::<rusqlite::Result<Vec<_>>>();
                    rows
                }
            };
            rows.map_err(db_err)
        })
        .await
    }
}

#[async_trait]
impl BattleRepository for SqliteRepo {
    async fn commit_battle(&self, commit: &BattleCommit) -> StoreResult<()> {
        let commit = commit.clone();
        self.run(move |conn| insert_battle_rows(conn, &commit)).await
    }

    async fn list_battles(&self, limit: usize) -> StoreResult<Vec<BattleRecord>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM battles ORDER BY start_time DESC, battle_id DESC LIMIT ?1",
                    BATTLE_COLUMNS
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![limit as i64], battle_from_row)
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows.map_err(db_err)
        })
        .await
    }

    async fn get_battle(&self, battle_id: i64) -> StoreResult<Option<BattleReport>> {
        self.run(move |conn| {
            let battle = conn
                .query_row(
                    &format!("SELECT {} FROM battles WHERE battle_id = ?1", BATTLE_COLUMNS),
                    params![battle_id],
                    battle_from_row,
                )
                .optional()
                .map_err(db_err)?;
            let Some(battle) = battle else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare(
                    "SELECT alliance_id, name, start_time, players, kills, kill_fame, deaths, \
                     death_fame, average_ip FROM battle_alliances WHERE battle_id = ?1 \
                     ORDER BY players DESC, kill_fame DESC, name",
                )
                .map_err(db_err)?;
            let alliances = stmt
                .query_map(params![battle_id], |row| {
                    Ok(AllianceRollup {
                        alliance_id: row.get(0)?,
                        name: row.get(1)?,
                        start_time: row.get(2)?,
                        players: row.get(3)?,
                        kills: row.get(4)?,
                        kill_fame: row.get(5)?,
                        deaths: row.get(6)?,
                        death_fame: row.get(7)?,
                        average_ip: row.get(8)?,
                    })
                })
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;

            let mut stmt = conn
                .prepare(
                    "SELECT guild_id, name, alliance_id, alliance_name, start_time, players, kills, \
                     kill_fame, deaths, death_fame, average_ip FROM battle_guilds \
                     WHERE battle_id = ?1 ORDER BY players DESC, kill_fame DESC, name",
                )
                .map_err(db_err)?;
            let guilds = stmt
                .query_map(params![battle_id], |row| {
                    Ok(GuildRollup {
                        guild_id: row.get(0)?,
                        name: row.get(1)?,
                        alliance_id: row.get(2)?,
                        alliance_name: row.get(3)?,
                        start_time: row.get(4)?,
                        players: row.get(5)?,
                        kills: row.get(6)?,
                        kill_fame: row.get(7)?,
                        deaths: row.get(8)?,
                        death_fame: row.get(9)?,
                        average_ip: row.get(10)?,
                    })
                })
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;

            let mut stmt = conn
                .prepare(
                    "SELECT player_id, name, start_time, alliance_id, alliance_name, guild_id, \
                     guild_name, kills, kill_fame, deaths, death_fame, weapon, average_ip, damage, \
                     healing, battle_players FROM battle_players WHERE battle_id = ?1 \
                     ORDER BY kill_fame DESC, kills DESC, name",
                )
                .map_err(db_err)?;
            let players = stmt
                .query_map(params![battle_id], |row| {
                    Ok(PlayerRollup {
                        player_id: row.get(0)?,
                        name: row.get(1)?,
                        start_time: row.get(2)?,
                        alliance_id: row.get(3)?,
                        alliance_name: row.get(4)?,
                        guild_id: row.get(5)?,
                        guild_name: row.get(6)?,
                        kills: row.get(7)?,
                        kill_fame: row.get(8)?,
                        deaths: row.get(9)?,
                        death_fame: row.get(10)?,
                        weapon: row.get(11)?,
                        average_ip: row.get(12)?,
                        damage: row.get(13)?,
                        healing: row.get(14)?,
                        battle_players: row.get(15)?,
                    })
                })
                .map_err(db_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err)?;

            Ok(Some(BattleReport {
                battle,
                alliances,
                guilds,
                players,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(event_id: i64, timestamp: i64, killer: &str, victim_guild: &str) -> KillRecord {
        KillRecord {
            event_id,
            timestamp,
            battle_id: 0,
            killer_name: killer.to_string(),
            victim_name: format!("victim{}", event_id),
            victim_guild: victim_guild.to_string(),
            fame: 1_000,
            participant_count: 1,
            ..KillRecord::default()
        }
    }

    fn queued(battle_id: i64, start_time: i64) -> NewQueueItem {
        NewQueueItem {
            battle_id,
            region: "americas".to_string(),
            start_time,
        }
    }

    fn commit(queue_id: i64, battle_id: i64) -> BattleCommit {
        BattleCommit {
            queue_id,
            battle: BattleRecord {
                battle_id,
                region: "americas".to_string(),
                start_time: 1_000,
                end_time: 2_000,
                total_fame: 5_000,
                total_kills: 2,
                total_players: 2,
                top_alliances: "AAA".to_string(),
                top_guilds: "Guild A".to_string(),
                processed_at: 3_000,
            },
            alliances: vec![AllianceRollup {
                alliance_id: "a1".to_string(),
                name: "AAA".to_string(),
                start_time: 1_000,
                players: 2,
                kills: 2,
                kill_fame: 5_000,
                ..AllianceRollup::default()
            }],
            guilds: vec![GuildRollup {
                guild_id: "g1".to_string(),
                name: "Guild A".to_string(),
                alliance_id: "a1".to_string(),
                alliance_name: "AAA".to_string(),
                players: 2,
                ..GuildRollup::default()
            }],
            players: vec![
                PlayerRollup {
                    player_id: "p1".to_string(),
                    name: "Alice".to_string(),
                    kill_fame: 5_000,
                    battle_players: 2,
                    ..PlayerRollup::default()
                },
                PlayerRollup {
                    player_id: "p2".to_string(),
                    name: "Bob".to_string(),
                    deaths: 1,
                    battle_players: 2,
                    ..PlayerRollup::default()
                },
            ],
            kills: vec![kill(1, 1_500, "Alice", "Guild B")],
        }
    }

    #[tokio::test]
    async fn insert_kills_ignores_stored_ids() {
        let repo = SqliteRepo::in_memory().expect("db");
        let first = repo
            .insert_kills(&[kill(1, 100, "a", "g"), kill(2, 200, "b", "g")])
            .await
            .expect("insert");
        assert_eq!(first, 2);

        let second = repo
            .insert_kills(&[kill(2, 200, "b", "g"), kill(3, 300, "c", "g")])
            .await
            .expect("insert again");
        assert_eq!(second, 1);

        let recent = repo.recent_event_ids(2).await.expect("recent");
        assert_eq!(recent, [2, 3].into_iter().collect());
    }

    #[tokio::test]
    async fn delete_before_cutoff_is_repeatable() {
        let repo = SqliteRepo::in_memory().expect("db");
        repo.insert_kills(&[kill(1, 100, "a", "g"), kill(2, 200, "b", "g")])
            .await
            .expect("insert");
        assert_eq!(repo.delete_kills_before(150).await.expect("delete"), 1);
        assert_eq!(repo.delete_kills_before(150).await.expect("delete again"), 0);
        let left = repo.list_kills(None, 10).await.expect("list");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].event_id, 2);
    }

    #[tokio::test]
    async fn kill_search_is_a_case_insensitive_prefix() {
        let repo = SqliteRepo::in_memory().expect("db");
        repo.insert_kills(&[
            kill(1, 100, "Zerg", "Knights"),
            kill(2, 200, "zebra", "Other"),
            kill(3, 300, "Abc", "knightfall"),
            kill(4, 400, "a_b", "Other"),
        ])
        .await
        .expect("insert");

        let hits = repo.list_kills(Some("ze"), 10).await.expect("search");
        let ids: Vec<i64> = hits.iter().map(|k| k.event_id).collect();
        assert_eq!(ids, vec![2, 1]);

        let hits = repo.list_kills(Some("KNIGHT"), 10).await.expect("search");
        let ids: Vec<i64> = hits.iter().map(|k| k.event_id).collect();
        assert_eq!(ids, vec![3, 1]);

        // underscore is literal, not a wildcard
        let hits = repo.list_kills(Some("a_"), 10).await.expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].event_id, 4);
    }

    #[tokio::test]
    async fn queue_tracks_boundary_and_pending_items() {
        let repo = SqliteRepo::in_memory().expect("db");
        assert_eq!(repo.latest_battle_id().await.expect("empty"), None);

        let inserted = repo
            .enqueue(&[queued(10, 1_000), queued(12, 3_000), queued(11, 2_000)])
            .await
            .expect("enqueue");
        assert_eq!(inserted, 3);
        assert_eq!(repo.latest_battle_id().await.expect("latest"), Some(12));

        let existing = repo
            .existing_battle_ids(&[9, 10, 12, 13])
            .await
            .expect("existing");
        assert_eq!(existing, [10, 12].into_iter().collect());

        let pending = repo.select_pending(10).await.expect("pending");
        let ids: Vec<i64> = pending.iter().map(|item| item.battle_id).collect();
        assert_eq!(ids, vec![12, 11, 10]);

        let newest = pending[0].queue_id;
        repo.mark_status(newest, QueueStatus::Processing)
            .await
            .expect("mark");
        let pending = repo.select_pending(10).await.expect("pending");
        assert_eq!(pending.len(), 2);

        let stuck = repo
            .list_items(Some(QueueStatus::Processing), 10)
            .await
            .expect("stuck");
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].battle_id, 12);

        let item = repo.get_item(newest).await.expect("get").expect("present");
        assert_eq!(item.status, QueueStatus::Processing);
        assert!(matches!(
            repo.mark_status(9_999, QueueStatus::Failed).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing_and_rejects_duplicates() {
        let repo = SqliteRepo::in_memory().expect("db");
        repo.enqueue(&[queued(77, 1_000)]).await.expect("enqueue");
        let queue_id = repo.select_pending(1).await.expect("pending")[0].queue_id;

        repo.commit_battle(&commit(queue_id, 77)).await.expect("commit");
        let item = repo.get_item(queue_id).await.expect("get").expect("item");
        assert_eq!(item.status, QueueStatus::Processed);

        let report = repo.get_battle(77).await.expect("get").expect("stored");
        assert_eq!(report.battle.total_players, 2);
        assert_eq!(report.alliances.len(), 1);
        assert_eq!(report.guilds[0].alliance_name, "AAA");
        assert_eq!(report.players[0].name, "Alice");

        let mut again = commit(queue_id, 77);
        again.players.push(PlayerRollup {
            player_id: "p3".to_string(),
            ..PlayerRollup::default()
        });
        let err = repo.commit_battle(&again).await.expect_err("duplicate");
        assert!(matches!(err, StoreError::DuplicateBattle(77)));
        let report = repo.get_battle(77).await.expect("get").expect("stored");
        assert_eq!(report.players.len(), 2);
    }

    #[tokio::test]
    async fn failed_commit_leaves_nothing_behind() {
        let repo = SqliteRepo::in_memory().expect("db");
        let mut broken = commit(1, 88);
        let dup = broken.players[0].clone();
        broken.players.push(dup);

        let err = repo.commit_battle(&broken).await.expect_err("unique");
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert!(repo.get_battle(88).await.expect("get").is_none());
        assert!(repo.list_battles(10).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn players_without_ids_are_keyed_by_name() {
        let repo = SqliteRepo::in_memory().expect("db");
        let mut anonymous = commit(1, 99);
        anonymous.players = vec![
            PlayerRollup {
                name: "Ann".to_string(),
                kills: 1,
                ..PlayerRollup::default()
            },
            PlayerRollup {
                name: "Bob".to_string(),
                deaths: 1,
                ..PlayerRollup::default()
            },
        ];

        repo.commit_battle(&anonymous).await.expect("commit");
        let report = repo.get_battle(99).await.expect("get").expect("stored");
        let mut names: Vec<&str> = report.players.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Ann", "Bob"]);
        assert!(report.players.iter().all(|p| p.player_id.is_empty()));
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("board.db");
        let path = path.to_string_lossy().to_string();

        {
            let repo = SqliteRepo::open(&path).expect("open");
            repo.insert_kills(&[kill(5, 500, "a", "g")]).await.expect("insert");
            repo.enqueue(&[queued(3, 300)]).await.expect("enqueue");
        }

        let repo = SqliteRepo::open(&path).expect("reopen");
        repo.ping().await.expect("ping");
        assert_eq!(repo.recent_event_ids(10).await.expect("ids").len(), 1);
        assert_eq!(repo.latest_battle_id().await.expect("latest"), Some(3));
    }
}
