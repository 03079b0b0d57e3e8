use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub http_enabled: bool,
    pub api_token: Option<String>,
    pub api_base_url: String,
    pub region: String,
    pub request_timeout_seconds: u64,
    pub fetch_max_attempts: u32,
    pub fetch_backoff_base_ms: u64,
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

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8090".to_string(),
            http_enabled: true,
            api_token: None,
            api_base_url: "https://gameinfo.albiononline.com/api/gameinfo".to_string(),
            region: "americas".to_string(),
            request_timeout_seconds: 30,
            fetch_max_attempts: 3,
            fetch_backoff_base_ms: 1000,
            kill_poll_interval_seconds: 10,
            kill_page_size: 51,
            kill_max_pages: 5,
            recent_ids_limit: 500,
            cleanup_interval_seconds: 3600,
            retention_days: 14,
            discovery_interval_seconds: 60,
            battle_page_size: 51,
            discovery_max_pages: 10,
            enqueue_interval_seconds: 60,
            enqueue_batch_limit: 100,
            work_queue_capacity: 100,
            battle_kills_page_size: 50,
            webhook_url: None,
            webhook_template: None,
            notify_min_players: 20,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub database_path: String,
}
