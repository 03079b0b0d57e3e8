use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use battleboard_domain::ports::NotificationSink;
use battleboard_domain::{BattleRecord, RuntimeConfig};

const DEFAULT_TEMPLATE: &str =
    "Battle {battle_id}: {players} players, {kills} kills, {fame} fame\nAlliances: {alliances}\nGuilds: {guilds}";

#[derive(Default)]
pub struct WebhookNotifier;

impl WebhookNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    fn spawn_battle_notice(&self, config: RuntimeConfig, battle: BattleRecord) {
        if config.webhook_url.is_none() {
            return;
        }
        tokio::spawn(async move {
            match send_notice(&config, &battle).await {
                Ok(()) => debug!(battle_id = battle.battle_id, "battle notice sent"),
                Err(err) => warn!(battle_id = battle.battle_id, "battle webhook failed: {}", err),
            }
        });
    }

    async fn check_target(&self, config: &RuntimeConfig) -> Result<()> {
        let url = resolve_webhook_url(config)?;
        let response = build_client(config)?.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("battle webhook responded {}", response.status());
        }
        Ok(())
    }
}

async fn send_notice(config: &RuntimeConfig, battle: &BattleRecord) -> Result<()> {
    let url = resolve_webhook_url(config)?;
    let template = config.webhook_template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
    let payload = build_payload(battle, template);

    build_client(config)?
        .post(url)
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

fn build_client(config: &RuntimeConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
        .build()?)
}

fn resolve_webhook_url(config: &RuntimeConfig) -> Result<&str> {
    config
        .webhook_url
        .as_deref()
        .ok_or_else(|| anyhow!("webhook_url not configured"))
}

fn render_message(battle: &BattleRecord, template: &str) -> String {
    let dash = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };
    template
        .replace("{battle_id}", &battle.battle_id.to_string())
        .replace("{region}", &battle.region)
        .replace("{players}", &battle.total_players.to_string())
        .replace("{kills}", &battle.total_kills.to_string())
        .replace("{fame}", &battle.total_fame.to_string())
        .replace("{alliances}", &dash(&battle.top_alliances))
        .replace("{guilds}", &dash(&battle.top_guilds))
}

fn build_payload(battle: &BattleRecord, template: &str) -> String {
    json!({ "content": render_message(battle, template) }).to_string()
}
