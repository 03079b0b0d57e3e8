// Battle entity
// Shape shared by the battle list and the battle detail endpoints

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleAlliance {
    pub id: String,
    pub name: String,
    pub kills: i64,
    pub deaths: i64,
    pub kill_fame: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleGuild {
    pub id: String,
    pub name: String,
    pub alliance: String,
    pub alliance_id: String,
    pub kills: i64,
    pub deaths: i64,
    pub kill_fame: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattlePlayer {
    pub id: String,
    pub name: String,
    pub guild_id: String,
    pub guild_name: String,
    pub alliance_id: String,
    pub alliance_name: String,
    pub kills: i64,
    pub deaths: i64,
    pub kill_fame: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleDetail {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_fame: i64,
    pub total_kills: i64,
    pub alliances: IndexMap<String, BattleAlliance>,
    pub guilds: IndexMap<String, BattleGuild>,
    pub players: IndexMap<String, BattlePlayer>,
}
