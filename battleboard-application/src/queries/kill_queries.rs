use tracing::error;

use crate::{AppError, AppState};
use battleboard_domain::{KillQuery, KillRecord};

pub async fn list_kills(state: &AppState, query: KillQuery) -> Result<Vec<KillRecord>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(term) = search {
        if term.len() > 64 {
            return Err(AppError::BadRequest("search term too long".to_string()));
        }
    }
    let rows = state
        .kill_repo
        .list_kills(search, limit)
        .await
        .map_err(|err| {
            error!("failed to list kills: {}", err);
            AppError::from(err)
        })?;
    Ok(rows)
}
