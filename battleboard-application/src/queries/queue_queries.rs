use crate::{AppError, AppState};
use battleboard_domain::{BattleQueueItem, QueueQuery, QueueStatus};

pub async fn list_queue(
    state: &AppState,
    query: QueueQuery,
) -> Result<Vec<BattleQueueItem>, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            QueueStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status '{}'", raw)))?,
        ),
    };
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    Ok(state.queue_repo.list_items(status, limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::harness;
    use battleboard_domain::RuntimeConfig;

    #[tokio::test]
    async fn filters_by_status() {
        let h = harness(RuntimeConfig::default());
        h.store.seed_queue(1, QueueStatus::Processing, 0);
        h.store.seed_queue(2, QueueStatus::Queued, 0);
        let rows = list_queue(
            &h.state,
            QueueQuery {
                status: Some("processing".to_string()),
                limit: None,
            },
        )
        .await
        .expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].battle_id, 1);
    }

    #[tokio::test]
    async fn unknown_status_is_bad_request() {
        let h = harness(RuntimeConfig::default());
        let err = list_queue(
            &h.state,
            QueueQuery {
                status: Some("stale".to_string()),
                limit: None,
            },
        )
        .await
        .expect_err("bad status");
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
