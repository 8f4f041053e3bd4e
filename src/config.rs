use std::time::Duration;

use config::{Config, Environment, File};
pub use config::ConfigError;
use serde::Deserialize;

use crate::grid::{GridConfig, GridResult, Instrument, RunnerConfig};

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
    /// Traded instrument and its exchange constraints
    pub instrument: Instrument,
    /// Grid strategy parameters
    pub grid: GridConfig,
    /// Event loop timing
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Paper market replay
    #[serde(default)]
    pub paper: PaperSettings,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RunnerSettings {
    /// Housekeeping timer period in milliseconds
    #[serde(default = "default_timer_interval_ms")]
    pub timer_interval_ms: u64,
    /// Timer ticks between pruning passes
    #[serde(default = "default_prune_every_ticks")]
    pub prune_every_ticks: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timer_interval_ms: default_timer_interval_ms(),
            prune_every_ticks: default_prune_every_ticks(),
        }
    }
}

impl RunnerSettings {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            timer_interval: Duration::from_millis(self.timer_interval_ms.max(1)),
            prune_every_ticks: self.prune_every_ticks,
        }
    }
}

fn default_timer_interval_ms() -> u64 {
    1000
}

fn default_prune_every_ticks() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct PaperSettings {
    /// JSON array of bid prices to replay
    #[serde(default = "default_ticks_file")]
    pub ticks_file: String,
    /// Delay between replayed prices in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            ticks_file: default_ticks_file(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl PaperSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

fn default_ticks_file() -> String {
    "demos/ticks.json".to_string()
}

fn default_tick_interval_ms() -> u64 {
    200
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Add configuration file
            .add_source(File::with_name(config_path))
            // Add environment variables (overrides file)
            // e.g. APP__GRID__STOP_LOSS_PRICE=38000
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Check instrument and grid parameters
    pub fn validate(&self) -> GridResult<()> {
        self.instrument.validate()?;
        self.grid.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DirectionBias;
    use rust_decimal_macros::dec;

    fn write_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_settings() {
        let path = write_config(
            "settings_full",
            r#"
[log]
level = "debug"

[instrument]
symbol = "BTCUSDT"
price_tick = "0.01"
min_volume = "0.001"

[grid]
upper_price = 50000
bottom_price = 40000
order_amount = 5000
max_open_orders = 4
stop_loss_price = 38000
direction_bias = "short"

[runner]
timer_interval_ms = 500

[paper]
ticks_file = "ticks.json"
"#,
        );
        let settings = Settings::new(path.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.instrument.price_tick, dec!(0.01));
        assert_eq!(settings.grid.upper_price, dec!(50000));
        assert_eq!(settings.grid.max_open_orders, 4);
        assert_eq!(settings.grid.stop_loss_price, dec!(38000));
        assert_eq!(settings.grid.direction_bias, DirectionBias::Short);
        assert_eq!(settings.runner.runner_config().timer_interval, Duration::from_millis(500));
        assert_eq!(settings.runner.prune_every_ticks, 10);
        assert_eq!(settings.paper.ticks_file, "ticks.json");
        assert_eq!(settings.paper.tick_interval_ms, 200);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_defaults_and_validation() {
        let path = write_config(
            "settings_minimal",
            r#"
[instrument]
symbol = "BTCUSDT"
price_tick = "0"
min_volume = "0.001"

[grid]
upper_price = "50000"
bottom_price = "40000"
order_amount = "5000"
"#,
        );
        let settings = Settings::new(path.to_str().unwrap()).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.runner.timer_interval_ms, 1000);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Settings::new("/nonexistent/grid_settings.toml").is_err());
    }
}
