// Read-side query parameters

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KillQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BattleQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}
