// Battle work queue entities

use serde::{Deserialize, Serialize};

use crate::value_objects::QueueStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleQueueItem {
    pub queue_id: i64,
    pub battle_id: i64,
    pub region: String,
    pub status: QueueStatus,
    pub start_time: i64,
    pub updated_at: i64,
}

impl BattleQueueItem {
    pub fn ticket(&self) -> QueueTicket {
        QueueTicket {
            queue_id: self.queue_id,
            battle_id: self.battle_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQueueItem {
    pub battle_id: i64,
    pub region: String,
    pub start_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueTicket {
    pub queue_id: i64,
    pub battle_id: i64,
}
