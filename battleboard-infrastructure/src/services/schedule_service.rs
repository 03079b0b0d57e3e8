use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use battleboard_application::commands::{
    discovery_commands, kill_commands, poll_commands, worker_commands,
};
use battleboard_application::AppState;
use battleboard_domain::QueueTicket;

async fn run_every<F, Fut>(name: &'static str, period: Duration, token: CancellationToken, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(job = name, "scheduled every {:?}", period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => job().await,
        }
    }
    info!(job = name, "stopped");
}

pub async fn schedule_kill_poll(state: AppState, token: CancellationToken) {
    let period = Duration::from_secs(state.config.kill_poll_interval_seconds);
    let state = &state;
    run_every("kill_poll", period, token, move || async move {
        if let Err(err) = poll_commands::run_poll_cycle(state).await {
            error!("kill poll failed: {}", err);
        }
    })
    .await;
}

pub async fn schedule_cleanup(state: AppState, token: CancellationToken) {
    let period = Duration::from_secs(state.config.cleanup_interval_seconds);
    let state = &state;
    run_every("cleanup", period, token, move || async move {
        if let Err(err) = kill_commands::cleanup(state).await {
            error!("kill cleanup failed: {}", err);
        }
    })
    .await;
}

pub async fn schedule_discovery(state: AppState, token: CancellationToken) {
    let period = Duration::from_secs(state.config.discovery_interval_seconds);
    let state = &state;
    run_every("discovery", period, token, move || async move {
        if let Err(err) = discovery_commands::fetch_new_battles(state).await {
            warn!("battle discovery failed: {}", err);
        }
    })
    .await;
}

pub async fn schedule_enqueue(
    state: AppState,
    sender: mpsc::Sender<QueueTicket>,
    token: CancellationToken,
) {
    let period = Duration::from_secs(state.config.enqueue_interval_seconds);
    let state = &state;
    let sender = &sender;
    let send_token = token.clone();
    run_every("enqueue", period, token, move || {
        let send_token = send_token.clone();
        async move {
            // a full work queue blocks the send; shutdown must not wait on it
            tokio::select! {
                _ = send_token.cancelled() => {}
                result = discovery_commands::enqueue_new_battles(state, sender) => {
                    if let Err(err) = result {
                        error!("battle enqueue failed: {}", err);
                    }
                }
            }
        }
    })
    .await;
}

pub async fn run_battle_worker(
    state: AppState,
    mut receiver: mpsc::Receiver<QueueTicket>,
    token: CancellationToken,
) {
    info!("battle worker started");
    loop {
        let ticket = tokio::select! {
            _ = token.cancelled() => break,
            next = receiver.recv() => match next {
                Some(ticket) => ticket,
                None => break,
            },
        };
        let outcome = worker_commands::process_queue_item(&state, ticket).await;
        debug!(
            queue_id = ticket.queue_id,
            battle_id = ticket.battle_id,
            "worker outcome {:?}",
            outcome
        );
    }
    info!("battle worker stopped");
}

pub async fn run_jobs_once(state: &AppState) -> anyhow::Result<()> {
    if let Err(err) = kill_commands::cleanup(state).await {
        error!("kill cleanup failed: {}", err);
    }
    if let Err(err) = poll_commands::run_poll_cycle(state).await {
        error!("kill poll failed: {}", err);
    }
    if let Err(err) = discovery_commands::fetch_new_battles(state).await {
        warn!("battle discovery failed: {}", err);
    }

    let (sender, mut receiver) = mpsc::channel(state.config.enqueue_batch_limit.max(1));
    let sent = discovery_commands::enqueue_new_battles(state, &sender).await?;
    drop(sender);
    let handled = worker_commands::process_available(state, &mut receiver).await;
    info!(
        "Single run: {} battles queued, {} handled, {} processed, {} failed",
        sent,
        handled,
        state.metrics.battles_processed(),
        state.metrics.battles_failed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use battleboard_application::{InFlight, Metrics};
    use battleboard_domain::ports::{BattleQueueRepository, TelemetryApi};
    use battleboard_domain::{
        BattleDetail, FetchError, KillEvent, NewQueueItem, QueueStatus, RuntimeConfig,
    };

    use super::*;
    use crate::repositories::SqliteRepo;
    use crate::services::{DefaultHealthService, WebhookNotifier};

    struct OfflineApi;

    fn offline(url: &str) -> FetchError {
        FetchError::Transport {
            url: url.to_string(),
            message: "offline".to_string(),
        }
    }

    #[async_trait]
    impl TelemetryApi for OfflineApi {
        async fn fetch_battles(&self, _: usize, _: usize) -> Result<Vec<BattleDetail>, FetchError> {
            Err(offline("/battles"))
        }
        async fn fetch_battle(&self, _: i64) -> Result<BattleDetail, FetchError> {
            Err(offline("/battles/1"))
        }
        async fn fetch_battle_kills(
            &self,
            _: i64,
            _: usize,
            _: usize,
        ) -> Result<Vec<KillEvent>, FetchError> {
            Err(offline("/events/battle/1"))
        }
        async fn fetch_kill_events(
            &self,
            _: usize,
            _: usize,
            _: &str,
        ) -> Result<Vec<KillEvent>, FetchError> {
            Err(offline("/events"))
        }
    }

    fn offline_state() -> (AppState, Arc<SqliteRepo>) {
        let config = RuntimeConfig::default();
        let repo = Arc::new(SqliteRepo::in_memory().expect("db"));
        let notifier = Arc::new(WebhookNotifier::new());
        let state = AppState {
            config: config.clone(),
            api: Arc::new(OfflineApi),
            kill_repo: repo.clone(),
            queue_repo: repo.clone(),
            battle_repo: repo.clone(),
            notifier: notifier.clone(),
            health: Arc::new(DefaultHealthService::new(repo.clone(), notifier, config)),
            metrics: Arc::new(Metrics::default()),
            in_flight: Arc::new(InFlight::default()),
        };
        (state, repo)
    }

    #[tokio::test]
    async fn worker_drains_until_senders_are_gone() {
        let (state, repo) = offline_state();
        repo.enqueue(&[NewQueueItem {
            battle_id: 9,
            region: "americas".to_string(),
            start_time: 1_000,
        }])
        .await
        .expect("enqueue");
        let item = repo.select_pending(1).await.expect("pending").remove(0);

        let (sender, receiver) = mpsc::channel(4);
        let worker = tokio::spawn(run_battle_worker(
            state.clone(),
            receiver,
            CancellationToken::new(),
        ));
        sender.send(item.ticket()).await.expect("send");
        drop(sender);
        worker.await.expect("worker");

        let stored = repo.get_item(item.queue_id).await.expect("get").expect("item");
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(state.metrics.battles_failed(), 1);
    }

    #[tokio::test]
    async fn loops_stop_on_cancel() {
        let (state, _repo) = offline_state();
        let token = CancellationToken::new();
        let (_sender, receiver) = mpsc::channel(1);

        let poll = tokio::spawn(schedule_kill_poll(state.clone(), token.clone()));
        let worker = tokio::spawn(run_battle_worker(state, receiver, token.clone()));
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), poll)
            .await
            .expect("poll stops")
            .expect("poll task");
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker stops")
            .expect("worker task");
    }

    #[tokio::test]
    async fn single_run_survives_an_offline_api() {
        let (state, _repo) = offline_state();
        run_jobs_once(&state).await.expect("single run");
    }
}
