use tracing::error;

use crate::{AppError, AppState};
use battleboard_domain::{BattleQuery, BattleRecord, BattleReport};

pub async fn list_battles(
    state: &AppState,
    query: BattleQuery,
) -> Result<Vec<BattleRecord>, AppError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 200);
    let rows = state.battle_repo.list_battles(limit).await.map_err(|err| {
        error!("failed to list battles: {}", err);
        AppError::from(err)
    })?;
    Ok(rows)
}

pub async fn get_battle(state: &AppState, battle_id: i64) -> Result<BattleReport, AppError> {
    state
        .battle_repo
        .get_battle(battle_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("battle {}", battle_id)))
}
