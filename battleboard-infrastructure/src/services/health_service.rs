use std::sync::Arc;

use async_trait::async_trait;
use battleboard_domain::ports::{HealthCheckService, NotificationSink};
use battleboard_domain::{KillEventRepository, RuntimeConfig};

pub struct DefaultHealthService {
    kill_repo: Arc<dyn KillEventRepository>,
    notifier: Arc<dyn NotificationSink>,
    config: RuntimeConfig,
}

impl DefaultHealthService {
    pub fn new(
        kill_repo: Arc<dyn KillEventRepository>,
        notifier: Arc<dyn NotificationSink>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            kill_repo,
            notifier,
            config,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_database(&self) -> anyhow::Result<bool> {
        self.kill_repo.ping().await?;
        Ok(true)
    }

    /// `false` when no webhook is configured.
    async fn check_notification_target(&self) -> anyhow::Result<bool> {
        if self.config.webhook_url.is_none() {
            return Ok(false);
        }
        self.notifier.check_target(&self.config).await.map(|_| true)
    }
}
