use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use battleboard_domain::{DbConfig, RuntimeConfig};

use crate::config::validation::{require_positive, validate_http_url};
use crate::utils::{blank_to_none, resolve_path};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub http_enabled: bool,
    pub api_token: Option<String>,
    pub api_base_url: String,
    pub region: String,
    pub request_timeout_seconds: u64,
    pub fetch_max_attempts: u32,
    pub fetch_backoff_base_ms: u64,
    pub database_path: String,
    pub kill_poll_interval_seconds: u64,
    pub kill_page_size: usize,
    pub kill_max_pages: usize,
    pub recent_ids_limit: usize,
    pub cleanup_interval_seconds: u64,
    pub retention_days: i64,
    pub discovery_interval_seconds: u64,
    pub battle_page_size: usize,
    pub discovery_max_pages: usize,
    pub enqueue_interval_seconds: u64,
    pub enqueue_batch_limit: usize,
    pub work_queue_capacity: usize,
    pub battle_kills_page_size: usize,
    pub webhook_url: Option<String>,
    pub webhook_template: Option<String>,
    pub notify_min_players: i64,
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            bind_addr: runtime.bind_addr,
            http_enabled: runtime.http_enabled,
            api_token: None,
            api_base_url: runtime.api_base_url,
            region: runtime.region,
            request_timeout_seconds: runtime.request_timeout_seconds,
            fetch_max_attempts: runtime.fetch_max_attempts,
            fetch_backoff_base_ms: runtime.fetch_backoff_base_ms,
            database_path: "./battleboard.db".to_string(),
            kill_poll_interval_seconds: runtime.kill_poll_interval_seconds,
            kill_page_size: runtime.kill_page_size,
            kill_max_pages: runtime.kill_max_pages,
            recent_ids_limit: runtime.recent_ids_limit,
            cleanup_interval_seconds: runtime.cleanup_interval_seconds,
            retention_days: runtime.retention_days,
            discovery_interval_seconds: runtime.discovery_interval_seconds,
            battle_page_size: runtime.battle_page_size,
            discovery_max_pages: runtime.discovery_max_pages,
            enqueue_interval_seconds: runtime.enqueue_interval_seconds,
            enqueue_batch_limit: runtime.enqueue_batch_limit,
            work_queue_capacity: runtime.work_queue_capacity,
            battle_kills_page_size: runtime.battle_kills_page_size,
            webhook_url: None,
            webhook_template: None,
            notify_min_players: runtime.notify_min_players,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("BATTLEBOARD_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            Self::from_toml_str(&content)?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| anyhow!("invalid config: {}", err))
    }

    pub fn normalize(&mut self) {
        self.api_token = blank_to_none(self.api_token.take());
        self.webhook_url = blank_to_none(self.webhook_url.take());
        self.webhook_template = blank_to_none(self.webhook_template.take());
        self.log_dir = blank_to_none(self.log_dir.take());
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.region = self.region.trim().to_lowercase();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.database_path = resolve_path(base, &self.database_path);
        self.log_dir = self.log_dir.take().map(|dir| resolve_path(base, &dir));
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        validate_http_url("api_base_url", &self.api_base_url)?;
        if let Some(url) = &self.webhook_url {
            validate_http_url("webhook_url", url)?;
        }
        if self.database_path.trim().is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        if self.region.is_empty() {
            return Err(anyhow!("region must not be empty"));
        }
        require_positive("request_timeout_seconds", self.request_timeout_seconds)?;
        require_positive("fetch_max_attempts", u64::from(self.fetch_max_attempts))?;
        require_positive("kill_poll_interval_seconds", self.kill_poll_interval_seconds)?;
        require_positive("kill_page_size", self.kill_page_size as u64)?;
        require_positive("kill_max_pages", self.kill_max_pages as u64)?;
        require_positive("recent_ids_limit", self.recent_ids_limit as u64)?;
        require_positive("cleanup_interval_seconds", self.cleanup_interval_seconds)?;
        require_positive("discovery_interval_seconds", self.discovery_interval_seconds)?;
        require_positive("battle_page_size", self.battle_page_size as u64)?;
        require_positive("discovery_max_pages", self.discovery_max_pages as u64)?;
        require_positive("enqueue_interval_seconds", self.enqueue_interval_seconds)?;
        require_positive("enqueue_batch_limit", self.enqueue_batch_limit as u64)?;
        require_positive("work_queue_capacity", self.work_queue_capacity as u64)?;
        require_positive("battle_kills_page_size", self.battle_kills_page_size as u64)?;
        if self.retention_days < 1 {
            return Err(anyhow!("retention_days must be at least 1"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            http_enabled: self.http_enabled,
            api_token: self.api_token.clone(),
            api_base_url: self.api_base_url.clone(),
            region: self.region.clone(),
            request_timeout_seconds: self.request_timeout_seconds,
            fetch_max_attempts: self.fetch_max_attempts,
            fetch_backoff_base_ms: self.fetch_backoff_base_ms,
            kill_poll_interval_seconds: self.kill_poll_interval_seconds,
            kill_page_size: self.kill_page_size,
            kill_max_pages: self.kill_max_pages,
            recent_ids_limit: self.recent_ids_limit,
            cleanup_interval_seconds: self.cleanup_interval_seconds,
            retention_days: self.retention_days,
            discovery_interval_seconds: self.discovery_interval_seconds,
            battle_page_size: self.battle_page_size,
            discovery_max_pages: self.discovery_max_pages,
            enqueue_interval_seconds: self.enqueue_interval_seconds,
            enqueue_batch_limit: self.enqueue_batch_limit,
            work_queue_capacity: self.work_queue_capacity,
            battle_kills_page_size: self.battle_kills_page_size,
            webhook_url: self.webhook_url.clone(),
            webhook_template: self.webhook_template.clone(),
            notify_min_players: self.notify_min_players,
            log_dir: self.log_dir.clone(),
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            database_path: self.database_path.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("BATTLEBOARD_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("BATTLEBOARD_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("BATTLEBOARD_API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Ok(value) = env::var("BATTLEBOARD_REGION") {
            self.region = value;
        }
        if let Ok(value) = env::var("BATTLEBOARD_DATABASE_PATH") {
            self.database_path = value;
        }
        if let Ok(value) = env::var("BATTLEBOARD_WEBHOOK_URL") {
            self.webhook_url = Some(value);
        }
        if let Ok(value) = env::var("BATTLEBOARD_WEBHOOK_TEMPLATE") {
            self.webhook_template = Some(value);
        }
        if let Ok(value) = env::var("BATTLEBOARD_LOG_DIR") {
            self.log_dir = Some(value);
        }
        env_parse("BATTLEBOARD_HTTP_ENABLED", &mut self.http_enabled);
        env_parse("BATTLEBOARD_REQUEST_TIMEOUT_SECONDS", &mut self.request_timeout_seconds);
        env_parse("BATTLEBOARD_FETCH_MAX_ATTEMPTS", &mut self.fetch_max_attempts);
        env_parse("BATTLEBOARD_FETCH_BACKOFF_BASE_MS", &mut self.fetch_backoff_base_ms);
        env_parse("BATTLEBOARD_KILL_POLL_INTERVAL_SECONDS", &mut self.kill_poll_interval_seconds);
        env_parse("BATTLEBOARD_KILL_PAGE_SIZE", &mut self.kill_page_size);
        env_parse("BATTLEBOARD_KILL_MAX_PAGES", &mut self.kill_max_pages);
        env_parse("BATTLEBOARD_RECENT_IDS_LIMIT", &mut self.recent_ids_limit);
        env_parse("BATTLEBOARD_CLEANUP_INTERVAL_SECONDS", &mut self.cleanup_interval_seconds);
        env_parse("BATTLEBOARD_RETENTION_DAYS", &mut self.retention_days);
        env_parse("BATTLEBOARD_DISCOVERY_INTERVAL_SECONDS", &mut self.discovery_interval_seconds);
        env_parse("BATTLEBOARD_BATTLE_PAGE_SIZE", &mut self.battle_page_size);
        env_parse("BATTLEBOARD_DISCOVERY_MAX_PAGES", &mut self.discovery_max_pages);
        env_parse("BATTLEBOARD_ENQUEUE_INTERVAL_SECONDS", &mut self.enqueue_interval_seconds);
        env_parse("BATTLEBOARD_ENQUEUE_BATCH_LIMIT", &mut self.enqueue_batch_limit);
        env_parse("BATTLEBOARD_WORK_QUEUE_CAPACITY", &mut self.work_queue_capacity);
        env_parse("BATTLEBOARD_BATTLE_KILLS_PAGE_SIZE", &mut self.battle_kills_page_size);
        env_parse("BATTLEBOARD_NOTIFY_MIN_PLAYERS", &mut self.notify_min_players);
    }
}

/// Unparseable values keep the current setting.
fn env_parse<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = env::var(key) {
        match value.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("ignoring invalid {}={}", key, value),
        }
    }
}
