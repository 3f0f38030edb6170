use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

/// Top-level config (vikord.toml + VIKORD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VikordConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub vikunja: VikunjaConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
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

/// Upstream Vikunja instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VikunjaConfig {
    /// REST base, e.g. `https://tasks.example.com/api/v1`.
    #[serde(default)]
    pub api_url: String,
    /// Web UI base used for deep links. Derived from `api_url` when unset.
    pub frontend_url: Option<String>,
    /// API token sent as `Authorization: Bearer <token>`.
    #[serde(default)]
    pub token: String,
}

impl VikunjaConfig {
    /// Base URL for links shown to users, without a trailing slash.
    pub fn frontend_base(&self) -> String {
        let base = match &self.frontend_url {
            Some(url) if !url.is_empty() => url.as_str(),
            _ => self.api_url.as_str(),
        };
        let base = base.trim_end_matches('/');
        base.strip_suffix("/api/v1").unwrap_or(base).to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    /// Shared HMAC-SHA256 secret configured on the Vikunja webhook.
    #[serde(default)]
    pub secret: String,
    /// Accept unsigned payloads when no secret is configured. Off by default.
    #[serde(default)]
    pub allow_unsigned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Register slash commands on this guild only (instant update) instead of globally.
    pub guild_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA zone every cadence is expressed and computed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl SchedulerConfig {
    pub fn tz(&self) -> crate::error::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            crate::error::VikordError::Config(format!("unknown time zone: {}", self.timezone))
        })
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vikord/vikord.db", home)
}

impl VikordConfig {
    /// Load config from a TOML file with VIKORD_* env var overrides.
    ///
    /// Uses the explicit path when given, otherwise `~/.vikord/vikord.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: VikordConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("VIKORD_").split("_"))
            .extract()
            .map_err(|e| crate::error::VikordError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vikord/vikord.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_base_strips_api_suffix() {
        let cfg = VikunjaConfig {
            api_url: "https://tasks.example.com/api/v1/".into(),
            frontend_url: None,
            token: String::new(),
        };
        assert_eq!(cfg.frontend_base(), "https://tasks.example.com");
    }

    #[test]
    fn explicit_frontend_wins() {
        let cfg = VikunjaConfig {
            api_url: "http://vikunja:3456/api/v1".into(),
            frontend_url: Some("https://tasks.example.com".into()),
            token: String::new(),
        };
        assert_eq!(cfg.frontend_base(), "https://tasks.example.com");
    }

    #[test]
    fn default_timezone_parses() {
        let tz = SchedulerConfig::default().tz().unwrap();
        assert_eq!(tz, chrono_tz::America::Sao_Paulo);
    }

    #[test]
    fn unknown_timezone_is_config_error() {
        let cfg = SchedulerConfig {
            timezone: "Mars/Olympus".into(),
        };
        assert!(matches!(cfg.tz(), Err(crate::error::VikordError::Config(_))));
    }
}
