//! Pulse configuration system.
//!
//! Values come from `~/.pulse/config.toml` (optional) and are then overlaid by
//! environment variables, which is how deployments normally configure Pulse.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PulseError, Result};

/// Placeholder values shipped in sample `.env` files. Treated as unset.
const PLACEHOLDERS: &[&str] = &[
    "your_ai_api_key_please_set_in_env",
    "your_actual_ai_api_key_here",
    "your_webhook_url_please_set_in_env",
];

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_database_url() -> String { "sqlite:///app_database.db".into() }

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            llm: LlmConfig::default(),
            webhook: WebhookConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl PulseConfig {
    /// Load from `path` (or the default path), then apply process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific TOML file, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PulseError::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| PulseError::Config(format!("Failed to parse config: {e}")))
    }

    /// Default config path (~/.pulse/config.toml).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pulse")
            .join("config.toml")
    }

    /// Overlay values from an environment lookup. Unparseable values are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("AI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_API_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("OPENAI_MODEL_NAME") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("WEBHOOK_URL") {
            self.webhook.url = v;
        }
        if let Some(v) = lookup("SUMMARY_SCHEDULE_HOURS") {
            self.schedule.daily_hours = ScheduleHours::parse(&v);
        }
        if let Some(v) = lookup("SUMMARY_INTERVAL_HOURS") {
            match v.trim().parse::<u32>() {
                Ok(n) => self.schedule.interval_hours = n,
                Err(_) => tracing::warn!("⚠️ Ignoring invalid SUMMARY_INTERVAL_HOURS: '{v}'"),
            }
        }
        if let Some(v) = lookup("RUN_SUMMARY_ON_STARTUP") {
            match parse_bool(&v) {
                Some(b) => self.schedule.run_on_startup = b,
                None => tracing::warn!("⚠️ Ignoring invalid RUN_SUMMARY_ON_STARTUP: '{v}'"),
            }
        }
        if let Some(v) = lookup("SUMMARY_LLM_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(n) if n > 0 => self.llm.timeout_secs = n,
                _ => tracing::warn!("⚠️ Ignoring invalid SUMMARY_LLM_TIMEOUT_SECS: '{v}'"),
            }
        }
        if let Some(v) = lookup("SUMMARY_WEBHOOK_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(n) if n > 0 => self.webhook.timeout_secs = n,
                _ => tracing::warn!("⚠️ Ignoring invalid SUMMARY_WEBHOOK_TIMEOUT_SECS: '{v}'"),
            }
        }
    }

    /// Filesystem path of the SQLite database behind `database_url`.
    pub fn database_path(&self) -> PathBuf {
        let raw = self
            .database_url
            .strip_prefix("sqlite:///")
            .or_else(|| self.database_url.strip_prefix("sqlite://"))
            .unwrap_or(&self.database_url);
        PathBuf::from(raw)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" | "t" => Some(true),
        "0" | "false" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn is_unset(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || PLACEHOLDERS.contains(&v)
}

/// Language-model endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "https://api.openai.com/v1".into() }
fn default_model() -> String { "gpt-4o-mini".into() }
fn default_llm_timeout() -> u64 { 120 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// False when the key is empty or still a sample placeholder.
    pub fn api_key_configured(&self) -> bool {
        !is_unset(&self.api_key)
    }
}

/// Outbound webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 { 10 }

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl WebhookConfig {
    pub fn url_configured(&self) -> bool {
        !is_unset(&self.url)
    }
}

/// Cadence of the digest jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run every N hours. 0 disables interval mode.
    #[serde(default)]
    pub interval_hours: u32,
    /// Daily fire hours in UTC+8. Ignored when `interval_hours > 0`.
    #[serde(default = "default_daily_hours")]
    pub daily_hours: ScheduleHours,
    #[serde(default = "bool_true")]
    pub enable_weekly: bool,
    /// Fire one detached daily digest right after startup.
    #[serde(default = "bool_true")]
    pub run_on_startup: bool,
    /// How often the scheduler loop checks for due jobs.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn bool_true() -> bool { true }
fn default_daily_hours() -> ScheduleHours { ScheduleHours(vec![17]) }
fn default_tick_secs() -> u64 { 30 }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: 0,
            daily_hours: default_daily_hours(),
            enable_weekly: true,
            run_on_startup: true,
            tick_secs: default_tick_secs(),
        }
    }
}

/// Daily fire hours, normalized from `"0,6,12"`, `17` or `[0, 6, 12]`.
///
/// Non-numeric tokens are dropped here. Range checks belong to the schedule
/// builder so it can report each rejected hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawHours", into = "String")]
pub struct ScheduleHours(pub Vec<u32>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHours {
    Number(i64),
    Text(String),
    List(Vec<i64>),
}

impl From<RawHours> for ScheduleHours {
    fn from(raw: RawHours) -> Self {
        match raw {
            RawHours::Text(s) => ScheduleHours::parse(&s),
            RawHours::Number(n) => ScheduleHours::from_numbers(&[n]),
            RawHours::List(v) => ScheduleHours::from_numbers(&v),
        }
    }
}

impl From<ScheduleHours> for String {
    fn from(hours: ScheduleHours) -> Self {
        hours.to_string()
    }
}

impl std::fmt::Display for ScheduleHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl ScheduleHours {
    /// Parse a comma-separated hour list.
    pub fn parse(raw: &str) -> Self {
        let mut hours = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<u32>() {
                Ok(h) => hours.push(h),
                Err(_) => tracing::warn!("⚠️ Invalid hour token '{token}' in SUMMARY_SCHEDULE_HOURS. Skipping."),
            }
        }
        Self(hours)
    }

    fn from_numbers(values: &[i64]) -> Self {
        let mut hours = Vec::new();
        for &n in values {
            match u32::try_from(n) {
                Ok(h) => hours.push(h),
                Err(_) => tracing::warn!("⚠️ Invalid hour {n} in schedule hours. Skipping."),
            }
        }
        Self(hours)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}
