//! Signal Generation Module
//!
//! Generators that turn aligned target and anchor candles into BUY/SELL/HOLD
//! calls. All of them share the `SignalGenerator` interface and its all-HOLD
//! fallback on bad input.

pub mod core;
pub mod lagged_anchor;
pub mod rules;

// Re-export core types for easy access
pub use self::core::{SignalCounts, SignalGenerator, SignalSeries, TradeSignal};
pub use self::lagged_anchor::{LaggedAnchorGenerator, ThresholdBand};
pub use self::rules::{Direction, PriceRule, RuleSignalGenerator, RuleStrategyConfig};
