use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use battleboard_domain::ports::TelemetryApi;
use battleboard_domain::{BattleDetail, FetchError, KillEvent, RuntimeConfig};

const MAX_ERROR_BODY: usize = 512;

pub struct HttpTelemetryApi {
    client: Client,
    base_url: String,
    max_attempts: u32,
    backoff_base: Duration,
}

impl HttpTelemetryApi {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("battleboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            max_attempts: config.fetch_max_attempts.max(1),
            backoff_base: Duration::from_millis(config.fetch_backoff_base_ms),
        })
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let mut failures = 0u32;
        loop {
            match self.try_fetch(&url, params).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    failures += 1;
                    if failures >= self.max_attempts {
                        return Err(FetchError::Exhausted {
                            attempts: failures,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.backoff_base * 2u32.saturating_pow(failures);
                    warn!(
                        url = %url,
                        attempt = failures,
                        "fetch failed, retrying in {:?}: {}",
                        delay,
                        err
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn try_fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let mut body = body;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(url, bytes = body.len(), "fetched page");
        serde_json::from_str(&body).map_err(|err| FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

fn fresh_token() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl TelemetryApi for HttpTelemetryApi {
    async fn fetch_battles(&self, offset: usize, limit: usize) -> Result<Vec<BattleDetail>, FetchError> {
        self.fetch_page(
            "/battles",
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("sort", "recent".to_string()),
                ("guid", fresh_token()),
            ],
        )
        .await
    }

    async fn fetch_battle(&self, battle_id: i64) -> Result<BattleDetail, FetchError> {
        self.fetch_page(&format!("/battles/{}", battle_id), &[("guid", fresh_token())])
            .await
    }

    async fn fetch_battle_kills(
        &self,
        battle_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<KillEvent>, FetchError> {
        self.fetch_page(
            &format!("/events/battle/{}", battle_id),
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("guid", fresh_token()),
            ],
        )
        .await
    }

    async fn fetch_kill_events(
        &self,
        offset: usize,
        limit: usize,
        cache_token: &str,
    ) -> Result<Vec<KillEvent>, FetchError> {
        self.fetch_page(
            "/events",
            &[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("guid", cache_token.to_string()),
            ],
        )
        .await
    }
}
