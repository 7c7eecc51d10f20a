use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BotError;

/// Environment variable that supplies (or overrides) the bot token.
pub const TOKEN_ENV: &str = "PIBOT_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub peripheral: PeripheralConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Display identity, used in the version banner
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_polling_period")]
    pub polling_period_secs: f64,
    /// Initial echo mode
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_host_label")]
    pub host_label: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PeripheralConfig {
    #[serde(default = "default_led_gpio")]
    pub led_gpio: u32,
    #[serde(default = "default_active_low")]
    pub active_low: bool,
    #[serde(default = "default_blink_period_ms")]
    pub blink_period_ms: u64,
    #[serde(default = "default_thermal_zone")]
    pub thermal_zone: PathBuf,
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            led_gpio: default_led_gpio(),
            active_low: default_active_low(),
            blink_period_ms: default_blink_period_ms(),
            thermal_zone: default_thermal_zone(),
            gpio_root: default_gpio_root(),
        }
    }
}

fn default_polling_period() -> f64 {
    0.5
}

fn default_host_label() -> String {
    "RPiZero".to_string()
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_led_gpio() -> u32 {
    17
}

fn default_active_low() -> bool {
    true
}

fn default_blink_period_ms() -> u64 {
    200
}

fn default_thermal_zone() -> PathBuf {
    PathBuf::from("/sys/class/thermal/thermal_zone0/temp")
}

fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.bot.token = Some(token);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Reject settings the bot cannot start with.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.bot.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(BotError::Config("bot.name is required".into()));
        }
        if self.bot.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(BotError::Config(format!(
                "bot.token is required (or set {})",
                TOKEN_ENV
            )));
        }
        let period = self.bot.polling_period_secs;
        if !period.is_finite() || period < 0.0 {
            return Err(BotError::Config(format!(
                "bot.polling_period_secs must be a non-negative number, got {}",
                period
            )));
        }
        if self.peripheral.blink_period_ms == 0 {
            return Err(BotError::Config(
                "peripheral.blink_period_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Bot name; only meaningful after `validate` succeeded.
    pub fn name(&self) -> &str {
        self.bot.name.as_deref().unwrap_or_default()
    }

    pub fn token(&self) -> &str {
        self.bot.token.as_deref().unwrap_or_default()
    }

    pub fn polling_period(&self) -> Duration {
        Duration::from_secs_f64(self.bot.polling_period_secs)
    }

    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.peripheral.blink_period_ms)
    }

    /// Banner reported by `version` and `/start`.
    pub fn version_banner(&self) -> String {
        format!(
            "@{} v{} running on {}",
            self.name(),
            env!("CARGO_PKG_VERSION"),
            self.bot.host_label
        )
    }
}
