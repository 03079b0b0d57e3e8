// Kill event entity
// One kill as reported by the telemetry feed, with every player snapshot attached

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    #[serde(rename = "Type", deserialize_with = "null_as_default")]
    pub item_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Equipment {
    #[serde(rename = "MainHand")]
    pub main_hand: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayerSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alliance_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alliance_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub guild_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub guild_name: String,
    pub kill_fame: i64,
    pub death_fame: i64,
    pub average_item_power: f64,
    pub damage_done: f64,
    pub support_healing_done: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub equipment: Equipment,
}

impl PlayerSnapshot {
    pub fn main_hand_type(&self) -> &str {
        self.equipment
            .main_hand
            .as_ref()
            .map(|item| item.item_type.as_str())
            .unwrap_or_default()
    }

    /// NPC kills and unattributed snapshots come through with an empty name.
    pub fn is_anonymous(&self) -> bool {
        self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KillEvent {
    #[serde(rename = "EventId")]
    pub event_id: i64,
    // the flat feed spells it TimeStamp, the per-battle feed Timestamp
    #[serde(rename = "TimeStamp", alias = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "BattleId")]
    pub battle_id: i64,
    #[serde(rename = "Killer")]
    pub killer: PlayerSnapshot,
    #[serde(rename = "Victim")]
    pub victim: PlayerSnapshot,
    #[serde(rename = "TotalVictimKillFame")]
    pub total_victim_kill_fame: i64,
    #[serde(rename = "GroupMembers", deserialize_with = "null_as_default")]
    pub group_members: Vec<PlayerSnapshot>,
    #[serde(rename = "Participants", deserialize_with = "null_as_default")]
    pub participants: Vec<PlayerSnapshot>,
    #[serde(rename = "numberOfParticipants")]
    pub number_of_participants: i64,
    #[serde(rename = "KillArea", deserialize_with = "null_as_default")]
    pub kill_area: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
