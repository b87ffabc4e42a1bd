//! Bridge configuration.

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::infra::process::DEFAULT_UI_COMMAND;
use crate::usecases::DEFAULT_RESPONSE_TIMEOUT;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_UI_GRACE_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    listen: String,
    document_root: PathBuf,
    response_timeout: Duration,
    poll_interval: Duration,
    ui_grace_period: Duration,
    ui_command: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BridgeConfig {
    pub fn listen(&self) -> &str {
        &self.listen
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn ui_grace_period(&self) -> Duration {
        self.ui_grace_period
    }

    pub fn ui_command(&self) -> &str {
        &self.ui_command
    }

    pub fn from_env() -> Self {
        Self {
            listen: parse_env_string("DRONE_BRIDGE_LISTEN", DEFAULT_LISTEN),
            document_root: env::var("DRONE_BRIDGE_ROOT")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_document_root),
            response_timeout: Duration::from_millis(parse_env_u64(
                "DRONE_BRIDGE_RESPONSE_TIMEOUT_MS",
                DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64,
            )),
            poll_interval: Duration::from_millis(parse_env_u64(
                "DRONE_BRIDGE_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            ui_grace_period: Duration::from_secs(parse_env_u64(
                "DRONE_BRIDGE_UI_GRACE_SECS",
                DEFAULT_UI_GRACE_SECS,
            )),
            ui_command: parse_env_string("DRONE_BRIDGE_UI_COMMAND", DEFAULT_UI_COMMAND),
        }
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn with_document_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.document_root = root.into();
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_ui_grace_period(mut self, grace: Duration) -> Self {
        self.ui_grace_period = grace;
        self
    }

    pub fn with_ui_command(mut self, command: impl Into<String>) -> Self {
        self.ui_command = command.into();
        self
    }
}

fn default_document_root() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn parse_env_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    if value.trim().is_empty() {
        return default;
    }
    match value.trim().parse::<u64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}
