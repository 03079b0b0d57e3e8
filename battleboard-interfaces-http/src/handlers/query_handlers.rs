use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use battleboard_application::queries::{battle_queries, kill_queries};
use battleboard_application::AppState;
use battleboard_domain::{BattleQuery, BattleRecord, BattleReport, KillQuery, KillRecord};

use crate::error::HttpError;
use crate::middleware::authorize;

pub async fn list_battles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BattleQuery>,
) -> Result<Json<Vec<BattleRecord>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let battles = battle_queries::list_battles(&state, query).await?;
    Ok(Json(battles))
}

pub async fn get_battle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(battle_id): Path<i64>,
) -> Result<Json<BattleReport>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let report = battle_queries::get_battle(&state, battle_id).await?;
    Ok(Json(report))
}

pub async fn list_kills(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KillQuery>,
) -> Result<Json<Vec<KillRecord>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let kills = kill_queries::list_kills(&state, query).await?;
    Ok(Json(kills))
}
