//! Core signal types and the generator interface
//!
//! Every generator exposes a fallible computation plus a guarded wrapper that
//! never fails: input problems degrade to an all-HOLD series of the right
//! length, and the result is checked before it is handed back.

use crate::market_data::{AnchorCandles, TargetCandles};
use crate::metadata::CoinMetadata;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete action emitted for one candle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl TradeSignal {
    pub const ALL: [TradeSignal; 3] = [TradeSignal::Buy, TradeSignal::Sell, TradeSignal::Hold];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSignal::Buy => "BUY",
            TradeSignal::Sell => "SELL",
            TradeSignal::Hold => "HOLD",
        }
    }

    /// Directional bias (-1, 0, +1)
    pub fn direction(&self) -> i8 {
        match self {
            TradeSignal::Buy => 1,
            TradeSignal::Sell => -1,
            TradeSignal::Hold => 0,
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSignal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        TradeSignal::ALL
            .into_iter()
            .find(|signal| signal.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown signal value: {:?}", s))
    }
}

/// Tally of each signal value in a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl SignalCounts {
    pub fn from_signals(signals: &[TradeSignal]) -> Self {
        signals.iter().fold(Self::default(), |mut counts, signal| {
            match signal {
                TradeSignal::Buy => counts.buy += 1,
                TradeSignal::Sell => counts.sell += 1,
                TradeSignal::Hold => counts.hold += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.buy + self.sell + self.hold
    }
}

/// Output table: one signal per target timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub signals: Vec<TradeSignal>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn counts(&self) -> SignalCounts {
        SignalCounts::from_signals(&self.signals)
    }
}

/// Canonical degraded output
pub fn all_hold(len: usize) -> Vec<TradeSignal> {
    vec![TradeSignal::Hold; len]
}

/// Post-generation self-check. A failure here is a generator defect, not bad input.
pub fn assert_signal_shape(signals: &[TradeSignal], expected_len: usize) {
    assert_eq!(
        signals.len(),
        expected_len,
        "signal series length {} does not match target length {}",
        signals.len(),
        expected_len
    );
}

/// Base trait for generators that turn aligned target/anchor closes into signals
pub trait SignalGenerator {
    /// Which target and anchor series this generator reads
    fn metadata(&self) -> &CoinMetadata;

    /// Compute one signal per target close. Errors describe bad input
    /// (missing columns, misaligned lengths, empty tables).
    fn try_generate_signals(
        &self,
        target_closes: &[Option<f64>],
        anchors: &AnchorCandles,
    ) -> Result<Vec<TradeSignal>>;

    /// Guarded variant of `try_generate_signals`; input faults yield all HOLD
    fn generate_signals(
        &self,
        target_closes: &[Option<f64>],
        anchors: &AnchorCandles,
    ) -> Vec<TradeSignal> {
        let expected_len = target_closes.len();
        let signals = match self.try_generate_signals(target_closes, anchors) {
            Ok(signals) => signals,
            Err(e) => {
                warn!(
                    "Signal generation for {} failed, emitting HOLD for all {} rows: {:#}",
                    self.metadata().target.symbol,
                    expected_len,
                    e
                );
                all_hold(expected_len)
            }
        };

        assert_signal_shape(&signals, expected_len);
        debug!(
            "Generated signals for {}: {:?}",
            self.metadata().target.symbol,
            SignalCounts::from_signals(&signals)
        );
        signals
    }

    /// Typed entry point: candles in, timestamped signals out
    fn generate(&self, target: &TargetCandles, anchors: &AnchorCandles) -> SignalSeries {
        SignalSeries {
            timestamps: target.timestamps().to_vec(),
            signals: self.generate_signals(target.closes(), anchors),
        }
    }
}
