//! Static descriptor of the candle series a generator needs.
//!
//! The caller reads it to know which target and anchor tables to load and how
//! anchor columns are named.

use crate::market_data::{TimeFrame, close_column_name};
use serde::{Deserialize, Serialize};

/// One instrument at one candle interval
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetSpec {
    pub symbol: String,
    pub timeframe: TimeFrame,
}

impl AssetSpec {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }

    /// Column holding this asset's closes in the anchor table
    pub fn close_column(&self) -> String {
        close_column_name(&self.symbol, self.timeframe)
    }
}

/// Target plus ordered anchors; the first anchor is the primary one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMetadata {
    pub target: AssetSpec,
    pub anchors: Vec<AssetSpec>,
}

impl CoinMetadata {
    pub fn anchor_columns(&self) -> Vec<String> {
        self.anchors.iter().map(AssetSpec::close_column).collect()
    }
}

impl Default for CoinMetadata {
    fn default() -> Self {
        coin_metadata()
    }
}

/// Descriptor for the lagged-anchor strategy: LDO signalled from ETH and BTC on 4H candles
pub fn coin_metadata() -> CoinMetadata {
    CoinMetadata {
        target: AssetSpec::new("LDO", TimeFrame::Hours4),
        anchors: vec![
            AssetSpec::new("ETH", TimeFrame::Hours4), // Primary anchor
            AssetSpec::new("BTC", TimeFrame::Hours4), // Secondary anchor
        ],
    }
}
