//! Lagged Anchor Signal Generator
//!
//! Signals a target asset from the lagged, weighted returns of its anchors.
//! Entry bands widen with the target's trailing volatility. With the exit
//! rule enabled the generator keeps a LONG/SHORT/FLAT bias from row to row
//! and drops back to FLAT when the target's own return moves against it.

use crate::config::{GeneratorConfig, SignalConfig};
use crate::market_data::AnchorCandles;
use crate::metadata::CoinMetadata;
use crate::signals::core::{SignalGenerator, TradeSignal};
use crate::stats;
use anyhow::{Result, anyhow, bail};
use log::{debug, info};

/// Volatility-scaled thresholds for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBand {
    pub entry: f64,
    pub exit: f64,
}

impl ThresholdBand {
    pub fn scaled(config: &SignalConfig, volatility: f64) -> Self {
        Self {
            entry: config.entry_threshold * (1.0 + volatility),
            exit: config.exit_threshold * (1.0 + volatility),
        }
    }

    /// BUY/SELL when the combined anchor signal leaves the band
    pub fn entry_call(&self, combined: f64) -> Option<TradeSignal> {
        if combined > self.entry {
            Some(TradeSignal::Buy)
        } else if combined < -self.entry {
            Some(TradeSignal::Sell)
        } else {
            None
        }
    }
}

/// Per-row inputs for the sequential pass, computed in bulk beforehand
#[derive(Debug, Clone, Copy)]
struct RowState {
    band: Option<ThresholdBand>,
    entry: Option<TradeSignal>,
    own_return: f64,
}

#[derive(Debug, Clone)]
pub struct LaggedAnchorGenerator {
    metadata: CoinMetadata,
    config: SignalConfig,
    window_len: usize,
}

impl LaggedAnchorGenerator {
    pub fn new(metadata: CoinMetadata, config: SignalConfig) -> Result<Self> {
        config.validate()?;
        if metadata.anchors.len() != config.anchor_weights.len() {
            bail!(
                "Configured {} anchor weights for {} anchors",
                config.anchor_weights.len(),
                metadata.anchors.len()
            );
        }

        let window_len = metadata
            .target
            .timeframe
            .window_len(config.lookback_days)
            .ok_or_else(|| {
                anyhow!(
                    "Lookback of {} days overflows the volatility window",
                    config.lookback_days
                )
            })?;
        if window_len < 2 {
            return Err(anyhow!(
                "Volatility window of {} candles is too short; increase lookback_days",
                window_len
            ));
        }

        info!(
            "Lagged anchor generator for {} {}: lag {} candles, volatility window {} candles, exit rule {}",
            metadata.target.symbol,
            metadata.target.timeframe,
            config.lag_period,
            window_len,
            if config.enable_exit_rule { "on" } else { "off" }
        );

        Ok(Self {
            metadata,
            config,
            window_len,
        })
    }

    pub fn from_config(config: GeneratorConfig) -> Result<Self> {
        Self::new(config.metadata, config.signal)
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Volatility window in candles, derived from the target timeframe
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Rows before this index are always HOLD
    pub fn warm_up(&self) -> usize {
        self.config.lag_period.max(self.window_len)
    }

    /// Weighted sum of lagged anchor returns, one value per row
    pub fn combined_anchor_signal(
        &self,
        anchors: &AnchorCandles,
        expected_len: usize,
    ) -> Result<Vec<Option<f64>>> {
        let mut lagged = Vec::with_capacity(self.metadata.anchors.len());
        for anchor in &self.metadata.anchors {
            let closes = anchors.close(&anchor.symbol, anchor.timeframe)?;
            if closes.len() != expected_len {
                bail!(
                    "Anchor column {} has {} rows but target has {}",
                    anchor.close_column(),
                    closes.len(),
                    expected_len
                );
            }
            let returns = stats::simple_returns(closes);
            lagged.push(stats::lag(&returns, self.config.lag_period));
        }
        stats::weighted_sum(&lagged, &self.config.anchor_weights)
    }

    fn row_states(
        &self,
        target_closes: &[Option<f64>],
        anchors: &AnchorCandles,
    ) -> Result<Vec<RowState>> {
        let len = target_closes.len();
        let own_returns = stats::simple_returns(target_closes);
        let volatility = stats::rolling_std(&own_returns, self.window_len)?;
        let combined = self.combined_anchor_signal(anchors, len)?;
        let warm_up = self.warm_up();

        Ok((0..len)
            .map(|i| {
                let band = if i < warm_up {
                    None
                } else {
                    volatility[i].map(|vol| ThresholdBand::scaled(&self.config, vol))
                };
                let entry = match (band, combined[i]) {
                    (Some(band), Some(signal)) => band.entry_call(signal),
                    _ => None,
                };
                RowState {
                    band,
                    entry,
                    own_return: own_returns[i],
                }
            })
            .collect())
    }

    fn next_signal(&self, previous: TradeSignal, row: &RowState) -> TradeSignal {
        let Some(band) = row.band else {
            return TradeSignal::Hold;
        };
        if let Some(entry) = row.entry {
            return entry;
        }
        if !self.config.enable_exit_rule {
            return TradeSignal::Hold;
        }

        match previous {
            TradeSignal::Buy if row.own_return < -band.exit => TradeSignal::Hold,
            TradeSignal::Sell if row.own_return > band.exit => TradeSignal::Hold,
            bias => bias,
        }
    }
}

impl Default for LaggedAnchorGenerator {
    fn default() -> Self {
        let metadata = CoinMetadata::default();
        let config = SignalConfig::default();
        let window_len = metadata.target.timeframe.intervals_per_day() * config.lookback_days;
        Self {
            metadata,
            config,
            window_len,
        }
    }
}

impl SignalGenerator for LaggedAnchorGenerator {
    fn metadata(&self) -> &CoinMetadata {
        &self.metadata
    }

    fn try_generate_signals(
        &self,
        target_closes: &[Option<f64>],
        anchors: &AnchorCandles,
    ) -> Result<Vec<TradeSignal>> {
        if target_closes.is_empty() {
            bail!("Target candle table is empty");
        }

        let rows = self.row_states(target_closes, anchors)?;
        let signals: Vec<TradeSignal> = rows
            .iter()
            .scan(TradeSignal::Hold, |previous, row| {
                let signal = self.next_signal(*previous, row);
                *previous = signal;
                Some(signal)
            })
            .collect();

        debug!(
            "{} rows evaluated, first decision row {}",
            signals.len(),
            self.warm_up()
        );
        Ok(signals)
    }
}
