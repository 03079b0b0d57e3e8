use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use battleboard_domain::ports::TelemetryApi;
use battleboard_domain::{FetchError, KillEvent};

use crate::commands::kill_commands::{self, SaveReport};
use crate::{AppError, AppState};

pub const MAX_POLL_PAGES: usize = 5;

#[derive(Debug, Default)]
pub struct PollOutcome {
    pub events: Vec<KillEvent>,
    pub pages_fetched: usize,
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub fetched: usize,
    pub pages: usize,
    pub partial: bool,
    pub save: SaveReport,
}

// a failed page ends the walk; what was gathered so far comes back with the error
pub async fn fetch_until_overlap(
    api: &dyn TelemetryApi,
    page_size: usize,
    max_pages: usize,
    known_ids: &HashSet<i64>,
) -> PollOutcome {
    let cache_token = Uuid::new_v4().to_string();
    let max_pages = max_pages.clamp(1, MAX_POLL_PAGES);
    let mut outcome = PollOutcome::default();
    let mut offset = 0usize;

    while outcome.pages_fetched < max_pages {
        let page = match api.fetch_kill_events(offset, page_size, &cache_token).await {
            Ok(page) => page,
            Err(err) => {
                warn!(offset, "kill feed page failed: {}", err);
                outcome.error = Some(err);
                break;
            }
        };
        outcome.pages_fetched += 1;

        if page.is_empty() {
            break;
        }

        let fetched = page.len();
        let known = page
            .iter()
            .filter(|event| known_ids.contains(&event.event_id))
            .count();
        outcome.events.extend(page);

        if known > 0 {
            debug!(offset, known, "overlap reached");
            break;
        }
        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    outcome
}

pub async fn run_poll_cycle(state: &AppState) -> Result<PollReport, AppError> {
    let known_ids = state
        .kill_repo
        .recent_event_ids(state.config.recent_ids_limit)
        .await
        .map_err(|err| {
            state.metrics.record_poll_error();
            AppError::from(err)
        })?;

    let outcome = fetch_until_overlap(
        state.api.as_ref(),
        state.config.kill_page_size,
        state.config.kill_max_pages,
        &known_ids,
    )
    .await;

    let fetched = outcome.events.len();
    state.metrics.record_poll(fetched);
    let partial = outcome.error.is_some();
    if let Some(err) = &outcome.error {
        state.metrics.record_poll_error();
        warn!("kill poll returned partial results: {}", err);
    }

    let save = if outcome.events.is_empty() {
        SaveReport::default()
    } else {
        kill_commands::save_events(state, outcome.events, &known_ids).await
    };

    if fetched > 0 {
        info!(
            "Kills: {} fetched, {} saved, {} skipped (duplicates), {} errors",
            fetched, save.saved, save.skipped, save.errored
        );
    }

    Ok(PollReport {
        fetched,
        pages: outcome.pages_fetched,
        partial,
        save,
    })
}
