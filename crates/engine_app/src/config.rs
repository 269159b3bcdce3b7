//! Client configuration.
//!
//! Defaults can be overridden by a JSON file, then by command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Configuration for the demo client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Target updates per second.
    pub tick_rate: f64,
    /// Number of ticks to run before tearing down (0 = unlimited).
    pub max_ticks: u64,
    /// Default `tracing` filter directive, merged with `RUST_LOG`.
    pub log_filter: String,
    /// Simulated texture fetch latency, in milliseconds.
    pub load_delay_ms: u64,
    /// Number of demo props to spawn.
    pub props: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 300,
            log_filter: "engine_app=info".to_string(),
            load_delay_ms: 20,
            props: 3,
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration file. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Override the number of ticks.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Override the tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the number of props.
    #[must_use]
    pub fn with_props(mut self, props: usize) -> Self {
        self.props = props;
        self
    }

    /// Check the values are usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick rate is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick_rate must be positive, got {}",
            self.tick_rate
        );
        Ok(())
    }

    /// Simulated texture fetch latency.
    #[must_use]
    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{ "max_ticks": 10 }"#).unwrap();
        assert_eq!(config.max_ticks, 10);
        assert_eq!(config.tick_rate, 60.0);
        assert_eq!(config.props, 3);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<RuntimeConfig>(r#"{ "tickrate": 30 }"#).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = RuntimeConfig::default().with_tick_rate(0.0);
        assert!(config.validate().is_err());
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = RuntimeConfig::default().with_max_ticks(5).with_props(1);
        assert_eq!(config.max_ticks, 5);
        assert_eq!(config.props, 1);
        assert_eq!(config.load_delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_from_missing_file_fails() {
        let err = RuntimeConfig::from_file(Path::new("/nonexistent/engine.json")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
