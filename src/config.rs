use std::env;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from environment variables. Everything has a
/// sensible default for a local backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the dashboard backend, no trailing slash.
    pub api_url: String,
    /// Full WebSocket URL of the live feed.
    pub ws_url: String,
    pub snapshot_interval: Duration,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
    /// Run without the terminal UI, logging view updates instead.
    pub headless: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("QUAKEFLOW_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "QUAKEFLOW_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let ws_url = match env::var("QUAKEFLOW_WS_URL") {
            Ok(url) => {
                if !url.starts_with("ws://") && !url.starts_with("wss://") {
                    return Err(ConfigError::InvalidValue(
                        "QUAKEFLOW_WS_URL must start with ws:// or wss://".to_string(),
                    ));
                }
                url
            }
            Err(_) => derive_ws_url(&api_url),
        };

        let snapshot_interval = Duration::from_secs(parse_secs("SNAPSHOT_INTERVAL_SECS", 60));
        let reconnect_base = Duration::from_secs(parse_secs("RECONNECT_BASE_SECS", 1));
        let reconnect_max = Duration::from_secs(parse_secs("RECONNECT_MAX_SECS", 30));

        let headless = env::var("QUAKEFLOW_HEADLESS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            .parse::<bool>()
            .unwrap_or(false);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            ws_url,
            snapshot_interval,
            reconnect_base,
            reconnect_max,
            headless,
            rust_log,
        })
    }

    pub fn snapshot_url(&self) -> String {
        format!("{}/api/dashboard-data/", self.api_url)
    }
}

/// The live feed shares the backend host; ws/wss mirrors the snapshot
/// scheme.
fn derive_ws_url(api_url: &str) -> String {
    let ws_base = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else {
        let rest = api_url.strip_prefix("http://").unwrap_or(api_url);
        format!("ws://{}", rest)
    };
    format!("{}/ws/earthquakes/", ws_base)
}

fn parse_secs(var: &str, default: u64) -> u64 {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .unwrap_or(default)
}
