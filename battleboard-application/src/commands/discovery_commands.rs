use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use battleboard_domain::{NewQueueItem, QueueTicket};

use crate::{AppError, AppState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub pages: usize,
    pub discovered: usize,
    pub enqueued: usize,
}

/// Queues every battle newer than the most recently queued one. A fetch
/// failure aborts the pass before anything is written.
pub async fn fetch_new_battles(state: &AppState) -> Result<DiscoveryReport, AppError> {
    let boundary = state.queue_repo.latest_battle_id().await?;
    let page_size = state.config.battle_page_size;
    let max_pages = match boundary {
        Some(_) => state.config.discovery_max_pages.max(1),
        None => 1,
    };

    let mut report = DiscoveryReport::default();
    let mut candidates: Vec<NewQueueItem> = Vec::new();
    let mut offset = 0usize;

    'walk: while report.pages < max_pages {
        let mut page = state.api.fetch_battles(offset, page_size).await?;
        report.pages += 1;
        if page.is_empty() {
            break;
        }

        let fetched = page.len();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        for battle in page {
            if boundary.map(|known| battle.id <= known).unwrap_or(false) {
                debug!(battle_id = battle.id, "reached last known battle");
                break 'walk;
            }
            candidates.push(NewQueueItem {
                battle_id: battle.id,
                region: state.config.region.clone(),
                start_time: battle.start_time.timestamp_millis(),
            });
        }

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    // the list shifts while we page through it, so a battle can show up twice
    let mut seen = HashSet::new();
    candidates.retain(|item| seen.insert(item.battle_id));
    report.discovered = candidates.len();

    if !candidates.is_empty() {
        let ids: Vec<i64> = candidates.iter().map(|item| item.battle_id).collect();
        let existing = state.queue_repo.existing_battle_ids(&ids).await?;
        candidates.retain(|item| !existing.contains(&item.battle_id));
    }

    if !candidates.is_empty() {
        report.enqueued = state.queue_repo.enqueue(&candidates).await?;
    }

    state.metrics.record_discovered(report.enqueued);
    if report.enqueued > 0 {
        info!(
            "Battles: {} discovered, {} queued (boundary {:?})",
            report.discovered, report.enqueued, boundary
        );
    }
    Ok(report)
}

/// Items the worker holds and has not finished are skipped.
pub async fn enqueue_new_battles(
    state: &AppState,
    sender: &mpsc::Sender<QueueTicket>,
) -> Result<usize, AppError> {
    let items = state
        .queue_repo
        .select_pending(state.config.enqueue_batch_limit)
        .await?;

    let mut sent = 0usize;
    for item in items {
        if state.in_flight.contains(item.queue_id) {
            continue;
        }
        // claim only once a slot is held, so a cancelled wait leaves nothing claimed
        let Ok(permit) = sender.reserve().await else {
            warn!("work queue closed, {} tickets sent", sent);
            break;
        };
        state.in_flight.claim(item.queue_id);
        permit.send(item.ticket());
        sent += 1;
    }

    state.metrics.record_dispatched(sent);
    if sent > 0 {
        debug!(sent, "battles handed to worker");
    }
    Ok(sent)
}
