use crate::metadata::CoinMetadata;
use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Upper bound on `lookback_days` (ten years)
const MAX_LOOKBACK_DAYS: usize = 3650;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub metadata: CoinMetadata,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Tunables for the lagged-anchor generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Candles by which anchor moves lead the target
    #[serde(default = "default_lag_period")]
    pub lag_period: usize,
    /// Volatility lookback in calendar days; converted to candles via the target timeframe
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
    #[serde(default = "default_entry_threshold")]
    pub entry_threshold: f64,
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,
    /// One weight per anchor, in metadata order
    #[serde(default = "default_anchor_weights")]
    pub anchor_weights: Vec<f64>,
    /// Hold a directional bias until the target's own return moves against it
    #[serde(default = "default_enable_exit_rule")]
    pub enable_exit_rule: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lag_period: default_lag_period(),
            lookback_days: default_lookback_days(),
            entry_threshold: default_entry_threshold(),
            exit_threshold: default_exit_threshold(),
            anchor_weights: default_anchor_weights(),
            enable_exit_rule: default_enable_exit_rule(),
        }
    }
}

fn default_lag_period() -> usize {
    2 // 8 hours at 4H candles
}

fn default_lookback_days() -> usize {
    30
}

fn default_entry_threshold() -> f64 {
    0.015 // 1.5%
}

fn default_exit_threshold() -> f64 {
    0.01 // 1.0%
}

fn default_anchor_weights() -> Vec<f64> {
    vec![0.6, 0.4] // Primary, secondary
}

fn default_enable_exit_rule() -> bool {
    false
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == 0 {
            return Err(anyhow!("Lookback must cover at least one day"));
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(anyhow!(
                "Lookback of {} days exceeds the maximum of {}",
                self.lookback_days,
                MAX_LOOKBACK_DAYS
            ));
        }

        for (name, value) in [
            ("entry_threshold", self.entry_threshold),
            ("exit_threshold", self.exit_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "{} must be a non-negative number, got: {}",
                    name,
                    value
                ));
            }
        }
        if self.exit_threshold > self.entry_threshold {
            warn!(
                "Exit threshold {:.4} is wider than entry threshold {:.4}",
                self.exit_threshold, self.entry_threshold
            );
        }

        if self.anchor_weights.is_empty() {
            return Err(anyhow!("At least one anchor weight is required"));
        }
        let total: f64 = self.anchor_weights.iter().sum();
        if (total - 1.0).abs() > 0.001 {
            return Err(anyhow!(
                "Anchor weights must sum to 1.0, got: {:.3}",
                total
            ));
        }
        Ok(())
    }
}

impl GeneratorConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_file("config.json")
    }

    /// Read a JSON config; a missing file falls back to defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: GeneratorConfig = match fs::read_to_string(path) {
            Ok(config_str) => serde_json::from_str(&config_str)
                .with_context(|| format!("Invalid config file {}", path.display()))?,
            Err(e) => {
                warn!(
                    "Could not read {} ({}), using default configuration",
                    path.display(),
                    e
                );
                Self::default()
            }
        };

        config.validate()?;
        info!(
            "Loaded configuration for {} with {} anchors",
            config.metadata.target.symbol,
            config.metadata.anchors.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.signal.validate()?;
        if self.signal.anchor_weights.len() != self.metadata.anchors.len() {
            return Err(anyhow!(
                "Configured {} anchor weights for {} anchors",
                self.signal.anchor_weights.len(),
                self.metadata.anchors.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signal.lag_period, 2);
        assert_eq!(config.signal.anchor_weights, vec![0.6, 0.4]);
        assert!(!config.signal.enable_exit_rule);
    }

    #[test]
    fn test_partial_json_uses_field_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"signal": {"lag_period": 3, "enable_exit_rule": true}}"#)
                .unwrap();
        assert_eq!(config.signal.lag_period, 3);
        assert!(config.signal.enable_exit_rule);
        assert_eq!(config.signal.entry_threshold, 0.015);
        assert_eq!(config.metadata.target.symbol, "LDO");
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let signal = SignalConfig {
            anchor_weights: vec![0.6, 0.6],
            ..SignalConfig::default()
        };
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_weight_count_must_match_anchors() {
        let config = GeneratorConfig {
            signal: SignalConfig {
                anchor_weights: vec![1.0],
                ..SignalConfig::default()
            },
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let signal = SignalConfig {
            entry_threshold: -0.01,
            ..SignalConfig::default()
        };
        assert!(signal.validate().is_err());
    }

    #[test]
    fn test_lookback_is_bounded() {
        let signal = SignalConfig {
            lookback_days: 3650,
            ..SignalConfig::default()
        };
        assert!(signal.validate().is_ok());

        let config: GeneratorConfig =
            serde_json::from_str(r#"{"signal": {"lookback_days": 9223372036854775807}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = GeneratorConfig::load_from_file("does/not/exist.json").unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }
}
