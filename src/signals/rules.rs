//! Rule-based anchor signals
//!
//! A configurable alternative to the lagged-anchor generator: BUY when every
//! buy rule holds, otherwise SELL when any sell rule holds, otherwise HOLD.
//! Each rule compares the lagged percentage change of one anchor column with
//! a fixed threshold.

use crate::market_data::{AnchorCandles, TimeFrame, close_column_name};
use crate::metadata::{AssetSpec, CoinMetadata};
use crate::signals::core::{SignalGenerator, TradeSignal};
use crate::stats;
use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Anchor column the strategy reads, with the lag its rules use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRef {
    pub symbol: String,
    pub timeframe: TimeFrame,
    #[serde(default)]
    pub lag: usize,
}

/// Threshold on the lagged percentage change of one anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    pub symbol: String,
    pub timeframe: TimeFrame,
    #[serde(default)]
    pub lag: usize,
    /// Percent, e.g. 3.0 for +3% or -3.0 for a 3% drop
    pub change_pct: f64,
    pub direction: Direction,
}

impl PriceRule {
    fn column(&self) -> String {
        close_column_name(&self.symbol, self.timeframe)
    }

    fn threshold(&self) -> f64 {
        self.change_pct / 100.0
    }

    /// Buy rules are strict: the move must exceed the threshold
    fn buy_passes(&self, change: f64) -> bool {
        match self.direction {
            Direction::Up => change > self.threshold(),
            Direction::Down => change < self.threshold(),
        }
    }

    /// Sell rules trigger on reaching the threshold
    fn sell_triggers(&self, change: f64) -> bool {
        match self.direction {
            Direction::Up => change >= self.threshold(),
            Direction::Down => change <= self.threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStrategyConfig {
    pub target: AssetSpec,
    pub anchors: Vec<AnchorRef>,
    pub buy_rules: Vec<PriceRule>,
    #[serde(default)]
    pub sell_rules: Vec<PriceRule>,
}

impl Default for RuleStrategyConfig {
    fn default() -> Self {
        let rule = |symbol: &str, timeframe, lag, change_pct, direction| PriceRule {
            symbol: symbol.to_string(),
            timeframe,
            lag,
            change_pct,
            direction,
        };

        Self {
            target: AssetSpec::new("LDO", TimeFrame::Hours1),
            anchors: vec![
                AnchorRef {
                    symbol: "BTC".to_string(),
                    timeframe: TimeFrame::Hours1,
                    lag: 4,
                },
                AnchorRef {
                    symbol: "ETH".to_string(),
                    timeframe: TimeFrame::Hours1,
                    lag: 4,
                },
                AnchorRef {
                    symbol: "ETH".to_string(),
                    timeframe: TimeFrame::Hours4,
                    lag: 0,
                },
            ],
            buy_rules: vec![
                rule("BTC", TimeFrame::Hours1, 4, 3.0, Direction::Up),
                rule("ETH", TimeFrame::Hours1, 4, 5.0, Direction::Up),
            ],
            sell_rules: vec![rule("ETH", TimeFrame::Hours4, 0, -3.0, Direction::Down)],
        }
    }
}

impl RuleStrategyConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Cannot read rule config {}", path.display()))?;
        let config: RuleStrategyConfig = serde_json::from_str(&config_str)
            .with_context(|| format!("Invalid rule config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buy_rules.is_empty() {
            return Err(anyhow!("Rule strategy needs at least one buy rule"));
        }

        for rule in self.buy_rules.iter().chain(&self.sell_rules) {
            if !rule.change_pct.is_finite() {
                bail!("Rule on {} has non-finite change_pct", rule.column());
            }
            let declared = self
                .anchors
                .iter()
                .any(|a| a.symbol == rule.symbol && a.timeframe == rule.timeframe);
            if !declared {
                bail!(
                    "Rule references {} which is not a declared anchor",
                    rule.column()
                );
            }
        }
        Ok(())
    }

    /// Distinct anchor (symbol, timeframe) pairs in declaration order
    pub fn metadata(&self) -> CoinMetadata {
        let mut anchors: Vec<AssetSpec> = Vec::new();
        for anchor in &self.anchors {
            let spec = AssetSpec::new(anchor.symbol.clone(), anchor.timeframe);
            if !anchors.contains(&spec) {
                anchors.push(spec);
            }
        }
        CoinMetadata {
            target: self.target.clone(),
            anchors,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleSignalGenerator {
    config: RuleStrategyConfig,
    metadata: CoinMetadata,
}

impl RuleSignalGenerator {
    pub fn new(config: RuleStrategyConfig) -> Result<Self> {
        config.validate()?;
        let metadata = config.metadata();
        info!(
            "Rule generator for {}: {} buy rules, {} sell rules over {} anchor columns",
            config.target.symbol,
            config.buy_rules.len(),
            config.sell_rules.len(),
            metadata.anchors.len()
        );
        Ok(Self { config, metadata })
    }

    pub fn config(&self) -> &RuleStrategyConfig {
        &self.config
    }

    /// Lagged change per rule, or None where the rule cannot be evaluated
    fn rule_changes(
        rule: &PriceRule,
        anchors: &AnchorCandles,
        len: usize,
    ) -> Result<Vec<Option<f64>>> {
        let closes = anchors.close(&rule.symbol, rule.timeframe)?;
        if closes.len() != len {
            bail!(
                "Anchor column {} has {} rows but target has {}",
                rule.column(),
                closes.len(),
                len
            );
        }

        let shifted = stats::lag(&stats::pct_change(closes), rule.lag);
        Ok(closes
            .iter()
            .copied()
            .zip(shifted)
            .map(|(close, change)| close.and(change.flatten()))
            .collect())
    }
}

impl SignalGenerator for RuleSignalGenerator {
    fn metadata(&self) -> &CoinMetadata {
        &self.metadata
    }

    fn try_generate_signals(
        &self,
        target_closes: &[Option<f64>],
        anchors: &AnchorCandles,
    ) -> Result<Vec<TradeSignal>> {
        let len = target_closes.len();
        if len == 0 {
            bail!("Target candle table is empty");
        }

        // Every anchor column must be present even if no rule reads it
        for spec in &self.metadata.anchors {
            anchors.close(&spec.symbol, spec.timeframe)?;
        }

        let key = |rule: &PriceRule| (rule.symbol.clone(), rule.timeframe, rule.lag);
        let mut changes: HashMap<(String, TimeFrame, usize), Vec<Option<f64>>> = HashMap::new();
        for rule in self.config.buy_rules.iter().chain(&self.config.sell_rules) {
            if !changes.contains_key(&key(rule)) {
                changes.insert(key(rule), Self::rule_changes(rule, anchors, len)?);
            }
        }

        let signals: Vec<TradeSignal> = (0..len)
            .map(|i| {
                let buy = self
                    .config
                    .buy_rules
                    .iter()
                    .all(|rule| changes[&key(rule)][i].is_some_and(|c| rule.buy_passes(c)));
                let sell = self
                    .config
                    .sell_rules
                    .iter()
                    .any(|rule| changes[&key(rule)][i].is_some_and(|c| rule.sell_triggers(c)));

                if buy {
                    TradeSignal::Buy
                } else if sell {
                    TradeSignal::Sell
                } else {
                    TradeSignal::Hold
                }
            })
            .collect();

        debug!("Rule evaluation finished for {} rows", signals.len());
        Ok(signals)
    }
}
