use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use battleboard_application::{AppState, InFlight, Metrics};
use battleboard_infrastructure::{
    AppConfig, DefaultHealthService, HttpTelemetryApi, SqliteRepo, WebhookNotifier,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let repo = Arc::new(SqliteRepo::open(&db_config.database_path)?);
        let notifier = Arc::new(WebhookNotifier::new());
        let api = Arc::new(HttpTelemetryApi::new(&runtime_config)?);
        let health = Arc::new(DefaultHealthService::new(
            repo.clone(),
            notifier.clone(),
            runtime_config.clone(),
        ));

        info!(
            database = %db_config.database_path,
            region = %runtime_config.region,
            api = %runtime_config.api_base_url,
            "context ready"
        );

        let state = AppState {
            config: runtime_config,
            api,
            kill_repo: repo.clone(),
            queue_repo: repo.clone(),
            battle_repo: repo,
            notifier,
            health,
            metrics: Arc::new(Metrics::default()),
            in_flight: Arc::new(InFlight::default()),
        };

        Ok(Self { state })
    }
}
