//! Lagged co-movement signals for a target asset driven by anchor assets.

pub mod config;
pub mod frame;
pub mod market_data;
pub mod metadata;
pub mod signals;
pub mod stats;

pub use config::{GeneratorConfig, SignalConfig};
pub use market_data::{AnchorCandles, TargetCandles, TimeFrame};
pub use metadata::{AssetSpec, CoinMetadata, coin_metadata};
pub use signals::{LaggedAnchorGenerator, SignalGenerator, SignalSeries, TradeSignal};
