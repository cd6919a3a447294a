// 7.0 config.rs: all settings in one place. margin params, ticker cadence, mocked latency.
// 7.1 lending seed data is not configurable here, FundingBook::new takes it directly.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::margin::MarginParams;

// Price ticker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerConfig {
    // Seconds between re-pricing passes
    pub interval_secs: u64,
    // Fixed RNG seed. None draws from OS entropy
    pub seed: Option<u64>,
    // Largest move per tick as a fraction of entry (0.02 = ±1%)
    pub max_move: Decimal,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            seed: None,
            max_move: Decimal::new(2, 2), // 0.02
        }
    }
}

impl TickerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/** 7.2: simulated latency of the mocked protocol calls, in milliseconds */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    // supply, withdraw, borrow, repay
    pub lending_delay_ms: u64,
    // open and close
    pub margin_delay_ms: u64,
    pub collateral_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lending_delay_ms: 700,
            margin_delay_ms: 1000,
            collateral_delay_ms: 500,
        }
    }
}

impl ServiceConfig {
    pub fn instant() -> Self {
        Self {
            lending_delay_ms: 0,
            margin_delay_ms: 0,
            collateral_delay_ms: 0,
        }
    }

    fn set_all(&mut self, delay_ms: u64) {
        self.lending_delay_ms = delay_ms;
        self.margin_delay_ms = delay_ms;
        self.collateral_delay_ms = delay_ms;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    // EnvFilter directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hydro_core=info,warn".to_string(),
        }
    }
}

// The complete desk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroConfig {
    pub environment: Environment,
    pub margin: MarginParams,
    pub ticker: TickerConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
}

impl Default for HydroConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            margin: MarginParams::default(),
            ticker: TickerConfig::default(),
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HydroConfig {
    // Deterministic and instant: fixed seed, no simulated latency, 1s ticks
    pub fn test() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Test;
        config.ticker.interval_secs = 1;
        config.ticker.seed = Some(7);
        config.service = ServiceConfig::instant();
        config.logging.filter = "hydro_core=debug".to_string();
        config
    }

    // Walkthrough binary: seeded so runs repeat, latency kept short
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Demo;
        config.ticker.interval_secs = 2;
        config.ticker.seed = Some(2024);
        config.service.lending_delay_ms = 70;
        config.service.margin_delay_ms = 100;
        config.service.collateral_delay_ms = 50;
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        // k must leave some margin before liquidation and never exceed the full initial margin
        if self.margin.risk_margin <= Decimal::ZERO || self.margin.risk_margin > Decimal::ONE {
            return Err(ConfigError::InvalidMargin {
                reason: "risk margin must be in (0, 1]".to_string(),
            });
        }

        if self.margin.collateral_tolerance <= Decimal::ZERO || self.margin.collateral_tolerance > Decimal::ONE {
            return Err(ConfigError::InvalidMargin {
                reason: "collateral tolerance must be in (0, 1]".to_string(),
            });
        }

        if self.margin.leverage_options.is_empty() {
            return Err(ConfigError::InvalidMargin {
                reason: "at least one leverage option required".to_string(),
            });
        }

        if self.margin.leverage_options.iter().any(|l| *l < Decimal::ONE) {
            return Err(ConfigError::InvalidMargin {
                reason: "leverage options must be at least 1x".to_string(),
            });
        }

        if self.ticker.interval_secs == 0 {
            return Err(ConfigError::InvalidTicker {
                reason: "tick interval must be positive".to_string(),
            });
        }

        if self.ticker.max_move <= Decimal::ZERO || self.ticker.max_move >= Decimal::ONE {
            return Err(ConfigError::InvalidTicker {
                reason: "max move must be in (0, 1)".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid margin config: {reason}")]
    InvalidMargin { reason: String },

    #[error("invalid ticker config: {reason}")]
    InvalidTicker { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Test,
    Demo,
}

impl Environment {
    pub fn config(&self) -> HydroConfig {
        match self {
            Environment::Development => HydroConfig::default(),
            Environment::Test => HydroConfig::test(),
            Environment::Demo => HydroConfig::demo(),
        }
    }
}

/// Load a [`HydroConfig`] from a JSON file, apply environment overrides and validate.
///
/// Missing fields fall back to the preset named by `environment` in the file.
///
/// | Env Var                    | Config Field                 |
/// |----------------------------|------------------------------|
/// | `HYDRO_TICK_INTERVAL_SECS` | `ticker.interval_secs`       |
/// | `HYDRO_RISK_MARGIN`        | `margin.risk_margin`         |
/// | `HYDRO_SERVICE_DELAY_MS`   | every `service.*_delay_ms`   |
pub fn load_config(path: &Path) -> Result<HydroConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config = parse_config(&contents).with_context(|| format!("parsing {}", path.display()))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate().context("config validation failed")?;
    Ok(config)
}

/// Preset for the current process: `HYDRO_ENV` picks the preset (`fallback` when unset),
/// env overrides apply on top.
pub fn config_from_env(fallback: Environment) -> Result<HydroConfig> {
    let environment = match env_string(&|key| std::env::var(key).ok(), "HYDRO_ENV").as_deref() {
        Some("development") => Environment::Development,
        Some("test") => Environment::Test,
        Some("demo") => Environment::Demo,
        _ => fallback,
    };
    let mut config = environment.config();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate().context("config validation failed")?;
    Ok(config)
}

// overlays the file onto its environment's preset so partial files are valid
fn parse_config(contents: &str) -> Result<HydroConfig> {
    let raw: serde_json::Value = serde_json::from_str(contents)?;
    let environment = match raw.get("environment") {
        Some(value) => serde_json::from_value(value.clone()).context("parsing environment")?,
        None => Environment::Development,
    };

    let mut merged = serde_json::to_value(environment.config())?;
    merge_json(&mut merged, raw);
    Ok(serde_json::from_value(merged)?)
}

fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Only non-empty values take effect. Parse failures are skipped and the loaded value stays.
pub fn apply_env_overrides<F>(config: &mut HydroConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env_string(&lookup, "HYDRO_TICK_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok()) {
        info!(val, "env override: HYDRO_TICK_INTERVAL_SECS");
        config.ticker.interval_secs = val;
    }

    if let Some(val) = env_string(&lookup, "HYDRO_RISK_MARGIN").and_then(|v| Decimal::from_str(&v).ok()) {
        info!(%val, "env override: HYDRO_RISK_MARGIN");
        config.margin.risk_margin = val;
    }

    if let Some(val) = env_string(&lookup, "HYDRO_SERVICE_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        info!(val, "env override: HYDRO_SERVICE_DELAY_MS");
        config.service.set_all(val);
    }
}

fn env_string<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_valid() {
        let config = HydroConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ticker.interval(), Duration::from_secs(15));
        assert_eq!(config.service.margin_delay_ms, 1000);
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Test.config().validate().is_ok());
        assert!(Environment::Demo.config().validate().is_ok());
        assert_eq!(Environment::Test.config().service, ServiceConfig::instant());
    }

    #[test]
    fn test_invalid_risk_margin() {
        let mut config = HydroConfig::default();
        config.margin.risk_margin = dec!(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMargin { .. })));
    }

    #[test]
    fn test_invalid_leverage_options() {
        let mut config = HydroConfig::default();
        config.margin.leverage_options = vec![dec!(0.5), dec!(2)];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMargin { .. })));

        config.margin.leverage_options.clear();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMargin { .. })));
    }

    #[test]
    fn test_zero_tick_interval() {
        let mut config = HydroConfig::default();
        config.ticker.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTicker { .. })));
    }

    #[test]
    fn test_partial_file_overlays_preset() {
        let config = parse_config(r#"{ "environment": "test", "ticker": { "interval_secs": 30 } }"#).unwrap();
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.ticker.interval_secs, 30);
        assert_eq!(config.ticker.seed, Some(7));
        assert_eq!(config.service, ServiceConfig::instant());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HYDRO_TICK_INTERVAL_SECS", "5"),
            ("HYDRO_RISK_MARGIN", "0.8"),
            ("HYDRO_SERVICE_DELAY_MS", ""),
        ]
        .into_iter()
        .collect();

        let mut config = HydroConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.ticker.interval_secs, 5);
        assert_eq!(config.margin.risk_margin, dec!(0.8));
        // empty values are ignored
        assert_eq!(config.service.lending_delay_ms, 700);
    }

    #[test]
    fn test_unparseable_override_skipped() {
        let mut config = HydroConfig::default();
        apply_env_overrides(&mut config, |k| (k == "HYDRO_TICK_INTERVAL_SECS").then(|| "soon".to_string()));
        assert_eq!(config.ticker.interval_secs, 15);
    }

    #[test]
    fn test_config_serialization() {
        let config = HydroConfig::demo();
        let json = serde_json::to_string(&config).unwrap();
        let back: HydroConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
