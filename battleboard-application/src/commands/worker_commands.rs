use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use battleboard_domain::ports::TelemetryApi;
use battleboard_domain::{
    aggregate_battle,
    alliance_inputs,
    current_millis,
    dedupe_kills,
    guild_inputs,
    top_alliances_by_participation,
    top_guilds_by_participation,
    BattleCommit,
    BattleQueueItem,
    BattleRecord,
    FetchError,
    KillEvent,
    KillRecord,
    QueueStatus,
    QueueTicket,
    StoreError,
};

use crate::{AppError, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkOutcome {
    Processed,
    Duplicate,
    Failed,
    Skipped,
    /// Processing failed and the failure could not be recorded either.
    Stuck,
}

pub async fn process_queue_item(state: &AppState, ticket: QueueTicket) -> WorkOutcome {
    let outcome = handle_ticket(state, ticket).await;
    state.in_flight.release(ticket.queue_id);
    outcome
}

async fn handle_ticket(state: &AppState, ticket: QueueTicket) -> WorkOutcome {
    let item = match state.queue_repo.get_item(ticket.queue_id).await {
        Ok(Some(item)) if item.status == QueueStatus::Processed => {
            debug!(queue_id = ticket.queue_id, battle_id = ticket.battle_id, "already processed");
            return WorkOutcome::Skipped;
        }
        Ok(Some(item)) => item,
        Ok(None) => {
            warn!(queue_id = ticket.queue_id, battle_id = ticket.battle_id, "queue item missing");
            return WorkOutcome::Skipped;
        }
        Err(err) => {
            error!(battle_id = ticket.battle_id, "failed to load queue item: {}", err);
            state.metrics.record_battle_failed();
            return WorkOutcome::Failed;
        }
    };

    if let Err(err) = state
        .queue_repo
        .mark_status(ticket.queue_id, QueueStatus::Processing)
        .await
    {
        error!(battle_id = ticket.battle_id, "failed to mark battle processing: {}", err);
        state.metrics.record_battle_failed();
        return WorkOutcome::Failed;
    }

    let commit = match build_commit(state, &item).await {
        Ok(commit) => commit,
        Err(err) => return record_failure(state, ticket, &err.to_string()).await,
    };

    match state.battle_repo.commit_battle(&commit).await {
        Ok(()) => {
            state.metrics.record_battle_processed();
            info!(
                battle_id = ticket.battle_id,
                "Battle saved: {} players, {} kills, {} fame",
                commit.battle.total_players,
                commit.kills.len(),
                commit.battle.total_fame
            );
            if commit.battle.total_players >= state.config.notify_min_players {
                state
                    .notifier
                    .spawn_battle_notice(state.config.clone(), commit.battle.clone());
            }
            WorkOutcome::Processed
        }
        Err(StoreError::DuplicateBattle(battle_id)) => {
            info!(battle_id, "battle already stored, closing queue item");
            state.metrics.record_battle_duplicate();
            match state
                .queue_repo
                .mark_status(ticket.queue_id, QueueStatus::Processed)
                .await
            {
                Ok(()) => WorkOutcome::Duplicate,
                Err(err) => {
                    error!(battle_id, "double failure, item left processing: {}", err);
                    WorkOutcome::Stuck
                }
            }
        }
        Err(err) => record_failure(state, ticket, &err.to_string()).await,
    }
}

pub async fn process_available(
    state: &AppState,
    receiver: &mut mpsc::Receiver<QueueTicket>,
) -> usize {
    let mut handled = 0usize;
    while let Ok(ticket) = receiver.try_recv() {
        process_queue_item(state, ticket).await;
        handled += 1;
    }
    handled
}

async fn build_commit(state: &AppState, item: &BattleQueueItem) -> Result<BattleCommit, AppError> {
    let battle = state.api.fetch_battle(item.battle_id).await?;
    let kills = fetch_battle_kills(
        state.api.as_ref(),
        item.battle_id,
        battle.total_kills,
        state.config.battle_kills_page_size,
    )
    .await?;
    let kills = dedupe_kills(kills);

    let start_time = battle.start_time.timestamp_millis();
    let aggregate = aggregate_battle(
        &alliance_inputs(&battle),
        &guild_inputs(&battle),
        start_time,
        &kills,
    );

    let record = BattleRecord {
        battle_id: item.battle_id,
        region: item.region.clone(),
        start_time,
        end_time: battle.end_time.timestamp_millis(),
        total_fame: battle.total_fame,
        total_kills: battle.total_kills,
        total_players: aggregate.players.len() as i64,
        top_alliances: top_alliances_by_participation(&aggregate.alliances),
        top_guilds: top_guilds_by_participation(&aggregate.guilds),
        processed_at: current_millis(),
    };

    Ok(BattleCommit {
        queue_id: item.queue_id,
        battle: record,
        alliances: aggregate.alliances,
        guilds: aggregate.guilds,
        players: aggregate.players,
        kills: kills.iter().map(KillRecord::from).collect(),
    })
}

/// Pages a battle's kill feed until `total_kills` is covered or a page comes back empty.
pub async fn fetch_battle_kills(
    api: &dyn TelemetryApi,
    battle_id: i64,
    total_kills: i64,
    page_size: usize,
) -> Result<Vec<KillEvent>, FetchError> {
    let total = usize::try_from(total_kills).unwrap_or(0);
    let page_size = page_size.max(1);
    let mut kills = Vec::with_capacity(total);
    let mut offset = 0usize;

    while offset < total {
        let page = api.fetch_battle_kills(battle_id, offset, page_size).await?;
        if page.is_empty() {
            break;
        }
        kills.extend(page);
        offset += page_size;
    }

    Ok(kills)
}

async fn record_failure(state: &AppState, ticket: QueueTicket, reason: &str) -> WorkOutcome {
    error!(battle_id = ticket.battle_id, "battle processing failed: {}", reason);
    state.metrics.record_battle_failed();
    match state
        .queue_repo
        .mark_status(ticket.queue_id, QueueStatus::Failed)
        .await
    {
        Ok(()) => WorkOutcome::Failed,
        Err(err) => {
            error!(
                battle_id = ticket.battle_id,
                "double failure, item left processing: {}", err
            );
            WorkOutcome::Stuck
        }
    }
}
