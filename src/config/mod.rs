use anyhow::{anyhow, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Dashboard settings, layered from an optional TOML file and an
/// `AURORA_DASH_`-prefixed environment overlay. Everything has a default so
/// the binary runs with no file at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiSettings,
    pub polling: PollingSettings,
    pub controls: ControlDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Repeat period shared by every panel, in milliseconds.
    pub period_ms: u64,
    /// Spacing between consecutive panels' initial firings.
    pub stagger_ms: u64,
    /// `n` passed to /logs/trades.
    pub trades_limit: u32,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            period_ms: 6000,
            stagger_ms: 500,
            trades_limit: 200,
        }
    }
}

/// Initial values for the control inputs; each can be edited at runtime
/// from the TUI prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefaults {
    pub interval: f64,
    pub eps: f64,
    pub stake: f64,
    pub fraction: f64,
    pub stake_cap_pct: f64,
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            interval: 0.5,
            eps: 0.1,
            stake: 0.1,
            fraction: 0.1,
            stake_cap_pct: 10.0,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("AURORA_DASH").separator("__"))
            .build()?;

        let parsed: DashboardConfig = settings.try_deserialize()?;
        parsed
            .validate()
            .map_err(|errors| anyhow!("invalid configuration: {}", errors.join(", ")))?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.api.base_url.is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        }
        if self.api.timeout_secs == 0 {
            errors.push("api.timeout_secs must be > 0".to_string());
        }
        if self.polling.period_ms == 0 {
            errors.push("polling.period_ms must be > 0".to_string());
        }
        if self.polling.trades_limit == 0 {
            errors.push("polling.trades_limit must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.controls.fraction) {
            errors.push("controls.fraction must be between 0 and 1".to_string());
        }
        if self.controls.interval <= 0.0 {
            errors.push("controls.interval must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
