use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// TTL handed to the push service — how long an undelivered reminder may sit
/// on the push endpoint before it is dropped (12 h; reminders are daily).
pub const DEFAULT_PUSH_TTL_SECS: u32 = 43_200;
/// Upper bound on a single delivery attempt so one unreachable endpoint
/// cannot stall the daily run.
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 15;

/// Top-level config (roster.toml + ROSTER_* env overrides).
///
/// Env keys use `__` as the section separator so snake_case field names
/// survive: `ROSTER_GATEWAY__CRON_SECRET`, `ROSTER_PUSH__VAPID_PRIVATE_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub push: PushConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            push: PushConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret the external scheduler presents as a bearer token.
    /// When unset, every cron/send endpoint denies with 401.
    pub cron_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            cron_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Web Push (VAPID) settings. Keys are URL-safe base64, generated once per
/// deployment (`npx web-push generate-vapid-keys` or openssl).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub vapid_public_key: String,
    #[serde(default)]
    pub vapid_private_key: String,
    /// Administrative contact required by the push protocol, e.g.
    /// "mailto:admin@example.org".
    #[serde(default)]
    pub subject: String,
    #[serde(default = "default_push_ttl")]
    pub ttl_secs: u32,
    #[serde(default = "default_push_timeout")]
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: String::new(),
            vapid_private_key: String::new(),
            subject: String::new(),
            ttl_secs: DEFAULT_PUSH_TTL_SECS,
            timeout_secs: DEFAULT_PUSH_TIMEOUT_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_push_ttl() -> u32 {
    DEFAULT_PUSH_TTL_SECS
}
fn default_push_timeout() -> u64 {
    DEFAULT_PUSH_TIMEOUT_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.roster/roster.db", home)
}

impl RosterConfig {
    /// Load config from a TOML file with ROSTER_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.roster/roster.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RosterConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ROSTER_").split("__"))
            .extract()
            .map_err(|e| crate::error::RosterError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.roster/roster.toml", home)
}
