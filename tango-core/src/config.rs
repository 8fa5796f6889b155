//! Coordinator configuration, loaded from YAML at start-up.
//!
//! Shape and loading style mirror `entity_gateway::config::GatewayConfig`:
//! a root struct with one sub-struct per concern, `#[serde(default)]` on
//! every knob that has a sane default, parsed once via `serde_yaml`.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TangoConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub gcp: GcpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_reaper_interval_ms")]
    pub reaper_interval_milliseconds: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            reaper_interval_milliseconds: default_reaper_interval_ms(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    1
}

fn default_reaper_interval_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GcpConfig {
    #[serde(default)]
    pub records_bucket: String,
    #[serde(default)]
    pub jwt_secret_name: String,
    #[serde(default)]
    pub test_token_secret_name: String,
    #[serde(default)]
    pub server_crt: Option<String>,
    #[serde(default)]
    pub server_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TangoConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.as_ref().display()))?;
        let config: TangoConfig = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.as_ref().display()))?;
        Ok(config)
    }

    pub fn assignment_lease(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.task.timeout_seconds)
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.task.reaper_interval_milliseconds)
    }
}
