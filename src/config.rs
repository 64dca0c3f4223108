use anyhow::{bail, Context, Result};
use config::{Config, Environment, File as ConfigFile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Flat key/value defaults persisted in `config.json` under the config
/// directory. Everything here can be overridden per run by CLI flags, and
/// by `DICEBOT_*`-style environment variables via the config layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub currency: String,
    pub min_bet: Decimal,
    pub min_profit: Decimal,
    pub house_edge: Decimal,
    pub chance_ceiling: Decimal,
    pub tick_delay_ms: u64,
    pub turbo_mode: bool,
    pub max_retries: u32,
    pub retry_pause_cap_ms: u64,
    pub api_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            currency: "btc".to_string(),
            min_bet: Decimal::new(1, 8),
            min_profit: Decimal::ZERO,
            house_edge: Decimal::new(3, 2),
            chance_ceiling: Decimal::new(98, 0),
            tick_delay_ms: 500,
            turbo_mode: false,
            max_retries: 3,
            retry_pause_cap_ms: 10_000,
            api_base_url: "https://duckdice.io/api".to_string(),
        }
    }
}

impl AppConfig {
    /// Layered load: built-in defaults, then `config.json`, then
    /// environment variables (`DICEBOT_MIN_BET=...`).
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let config_path = config_dir().join("config.json");
        let config = Config::builder()
            .set_default("currency", defaults.currency.clone())?
            .set_default("min_bet", defaults.min_bet.to_string())?
            .set_default("min_profit", defaults.min_profit.to_string())?
            .set_default("house_edge", defaults.house_edge.to_string())?
            .set_default("chance_ceiling", defaults.chance_ceiling.to_string())?
            .set_default("tick_delay_ms", defaults.tick_delay_ms)?
            .set_default("turbo_mode", defaults.turbo_mode)?
            .set_default("max_retries", u64::from(defaults.max_retries))?
            .set_default("retry_pause_cap_ms", defaults.retry_pause_cap_ms)?
            .set_default("api_base_url", defaults.api_base_url.clone())?
            .add_source(ConfigFile::from(config_path).required(false))
            .add_source(Environment::with_prefix("DICEBOT"))
            .build()
            .context("building configuration")?;
        config.try_deserialize().context("parsing configuration")
    }

    /// Persist the current values to `config.json`.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join("config.json");
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))
    }

    /// Apply one `config set <key> <value>` assignment.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "currency" => self.currency = value.to_lowercase(),
            "min_bet" => self.min_bet = dicebot_models::money::parse_amount(value)?,
            "min_profit" => self.min_profit = dicebot_models::money::parse_amount(value)?,
            "house_edge" => {
                self.house_edge = value.parse().context("house_edge must be a decimal")?;
            }
            "chance_ceiling" => {
                self.chance_ceiling = value.parse().context("chance_ceiling must be a decimal")?;
            }
            "tick_delay_ms" => {
                self.tick_delay_ms = value.parse().context("tick_delay_ms must be an integer")?;
            }
            "turbo_mode" => {
                self.turbo_mode = value.parse().context("turbo_mode must be true or false")?;
            }
            "max_retries" => {
                self.max_retries = value.parse().context("max_retries must be an integer")?;
            }
            "retry_pause_cap_ms" => {
                self.retry_pause_cap_ms = value
                    .parse()
                    .context("retry_pause_cap_ms must be an integer")?;
            }
            "api_base_url" => self.api_base_url = value.to_string(),
            other => bail!("unknown config key '{other}'"),
        }
        Ok(())
    }
}

/// `~/.duckdice`, or wherever `DUCKDICE_CONFIG_DIR` points.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = env::var("DUCKDICE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".duckdice")
}

/// `<cwd>/bet_history/auto`, where session journals accumulate.
pub fn journal_dir() -> PathBuf {
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("bet_history")
        .join("auto")
}

/// Path of the SQLite session index.
pub fn history_db_path() -> PathBuf {
    config_dir().join("history.db")
}

/// Live-mode credentials come from the environment only; they are never
/// written to the config file.
pub fn api_key() -> Result<String> {
    env::var("DUCKDICE_API_KEY").context("DUCKDICE_API_KEY is not set")
}
