use std::sync::Arc;

use battleboard_domain::ports::{
    BattleQueueRepository,
    BattleRepository,
    HealthCheckService,
    KillEventRepository,
    NotificationSink,
    TelemetryApi,
};
use battleboard_domain::RuntimeConfig;

use crate::{InFlight, Metrics};

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub api: Arc<dyn TelemetryApi>,
    pub kill_repo: Arc<dyn KillEventRepository>,
    pub queue_repo: Arc<dyn BattleQueueRepository>,
    pub battle_repo: Arc<dyn BattleRepository>,
    pub notifier: Arc<dyn NotificationSink>,
    pub health: Arc<dyn HealthCheckService>,
    pub metrics: Arc<Metrics>,
    pub in_flight: Arc<InFlight>,
}
