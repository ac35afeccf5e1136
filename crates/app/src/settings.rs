//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml`, overridden by `EXPENSES__SECTION__KEY`
//! environment variables.

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use engine::Currency;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
            timezone: default_timezone(),
        }
    }
}

impl App {
    pub fn timezone(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| format!("invalid timezone {:?}: {err}", self.timezone))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default)]
    pub allowed_users: Vec<u64>,
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
}

impl Telegram {
    pub fn currencies(&self) -> Result<Vec<Currency>, String> {
        self.currencies
            .iter()
            .map(|code| Currency::try_from(code.as_str()).map_err(|err| err.to_string()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct Monitor {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            threshold_percent: default_threshold_percent(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub database: Database,
    pub telegram: Option<Telegram>,
    #[serde(default)]
    pub monitor: Monitor,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("EXPENSES")
                        .separator("__")
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("telegram.allowed_users")
                        .with_list_parse_key("telegram.currencies"),
                ),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "Europe/Kyiv".to_string()
}

fn default_currencies() -> Vec<String> {
    ["USD", "EUR", "UAH", "PLN", "CAD"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_interval_secs() -> u64 {
    60 * 60
}

fn default_threshold_percent() -> f64 {
    70.0
}
