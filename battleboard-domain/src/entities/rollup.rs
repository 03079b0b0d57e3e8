// Per-battle rollups and the flat records written to the store

use serde::{Deserialize, Serialize};

use crate::entities::KillEvent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllianceInput {
    pub alliance_id: String,
    pub name: String,
    pub start_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildInput {
    pub guild_id: String,
    pub name: String,
    pub alliance_id: String,
    pub alliance_name: String,
    pub start_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllianceRollup {
    pub alliance_id: String,
    pub name: String,
    pub start_time: i64,
    pub players: i64,
    pub kills: i64,
    pub kill_fame: i64,
    pub deaths: i64,
    pub death_fame: i64,
    pub average_ip: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildRollup {
    pub guild_id: String,
    pub name: String,
    pub alliance_id: String,
    pub alliance_name: String,
    pub start_time: i64,
    pub players: i64,
    pub kills: i64,
    pub kill_fame: i64,
    pub deaths: i64,
    pub death_fame: i64,
    pub average_ip: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerRollup {
    pub player_id: String,
    pub name: String,
    pub start_time: i64,
    pub alliance_id: String,
    pub alliance_name: String,
    pub guild_id: String,
    pub guild_name: String,
    pub kills: i64,
    pub kill_fame: i64,
    pub deaths: i64,
    pub death_fame: i64,
    pub weapon: String,
    pub average_ip: f64,
    pub damage: f64,
    pub healing: f64,
    pub battle_players: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleRecord {
    pub battle_id: i64,
    pub region: String,
    pub start_time: i64,
    pub end_time: i64,
    pub total_fame: i64,
    pub total_kills: i64,
    pub total_players: i64,
    pub top_alliances: String,
    pub top_guilds: String,
    pub processed_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    pub event_id: i64,
    pub timestamp: i64,
    pub battle_id: i64,
    pub killer_name: String,
    pub killer_guild: String,
    pub killer_alliance: String,
    pub killer_weapon: String,
    pub killer_ip: f64,
    pub victim_name: String,
    pub victim_guild: String,
    pub victim_alliance: String,
    pub victim_weapon: String,
    pub victim_ip: f64,
    pub participant_count: i64,
    pub fame: i64,
}

impl From<&KillEvent> for KillRecord {
    fn from(event: &KillEvent) -> Self {
        let participant_count = if event.number_of_participants > 0 {
            event.number_of_participants
        } else {
            event.participants.len() as i64
        };
        Self {
            event_id: event.event_id,
            timestamp: event.timestamp.timestamp_millis(),
            battle_id: event.battle_id,
            killer_name: event.killer.name.clone(),
            killer_guild: event.killer.guild_name.clone(),
            killer_alliance: event.killer.alliance_name.clone(),
            killer_weapon: event.killer.main_hand_type().to_string(),
            killer_ip: event.killer.average_item_power,
            victim_name: event.victim.name.clone(),
            victim_guild: event.victim.guild_name.clone(),
            victim_alliance: event.victim.alliance_name.clone(),
            victim_weapon: event.victim.main_hand_type().to_string(),
            victim_ip: event.victim.average_item_power,
            participant_count,
            fame: event.total_victim_kill_fame,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleCommit {
    pub queue_id: i64,
    pub battle: BattleRecord,
    pub alliances: Vec<AllianceRollup>,
    pub guilds: Vec<GuildRollup>,
    pub players: Vec<PlayerRollup>,
    pub kills: Vec<KillRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    pub battle: BattleRecord,
    pub alliances: Vec<AllianceRollup>,
    pub guilds: Vec<GuildRollup>,
    pub players: Vec<PlayerRollup>,
}
