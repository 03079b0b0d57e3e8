use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info};

use battleboard_domain::{current_millis, retention_cutoff_millis, KillEvent, KillRecord};

use crate::{AppError, AppState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub saved: usize,
    pub skipped: usize,
    pub errored: usize,
}

// a failed transaction counts the whole remainder as errored
pub async fn save_events(
    state: &AppState,
    events: Vec<KillEvent>,
    known_ids: &HashSet<i64>,
) -> SaveReport {
    let mut report = SaveReport::default();
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(events.len());

    for event in &events {
        if !seen.insert(event.event_id) {
            continue;
        }
        if known_ids.contains(&event.event_id) {
            report.skipped += 1;
            continue;
        }
        records.push(KillRecord::from(event));
    }

    if !records.is_empty() {
        match state.kill_repo.insert_kills(&records).await {
            Ok(inserted) => {
                report.saved = inserted;
                report.skipped += records.len().saturating_sub(inserted);
            }
            Err(err) => {
                error!(count = records.len(), "failed to save kills: {}", err);
                report.errored = records.len();
            }
        }
    }

    state
        .metrics
        .record_save(report.saved, report.skipped, report.errored);
    report
}

pub async fn cleanup(state: &AppState) -> Result<usize, AppError> {
    let cutoff = retention_cutoff_millis(current_millis(), state.config.retention_days);
    let deleted = state.kill_repo.delete_kills_before(cutoff).await?;
    state.metrics.record_cleanup(deleted);
    if deleted > 0 {
        info!(
            "Cleanup: deleted {} kills older than {} days",
            deleted, state.config.retention_days
        );
    }
    Ok(deleted)
}
