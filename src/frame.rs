//! DataFrame boundary for signal generation
//!
//! Callers hand over a target frame (`timestamp`, `close`) and an anchor frame
//! with one `close_<SYMBOL>_<TIMEFRAME>` column per anchor, and get back a
//! frame with the target's `timestamp` column and a `signal` column.

use crate::market_data::AnchorCandles;
use crate::metadata::CoinMetadata;
use crate::signals::core::{SignalGenerator, TradeSignal, all_hold};
use anyhow::{Context, Result, anyhow, bail};
use log::warn;
use polars::prelude::*;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const CLOSE_COLUMN: &str = "close";
pub const SIGNAL_COLUMN: &str = "signal";

/// Read a column as nullable floats; nulls are price gaps
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = match df.column(name) {
        Ok(column) => column,
        Err(_) => {
            let names = df.get_column_names();
            match names.iter().find(|n| n.as_str().eq_ignore_ascii_case(name)) {
                Some(near) => bail!(
                    "Missing required column {} (found {} with non-canonical casing)",
                    name,
                    near.as_str()
                ),
                None => bail!("Missing required column {}", name),
            }
        }
    };

    let series = column
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .with_context(|| format!("Column {} is not numeric", name))?;
    let values = series.f64()?;
    Ok(values.into_iter().collect())
}

/// Target closes from the target frame
pub fn target_closes(target: &DataFrame) -> Result<Vec<Option<f64>>> {
    if target.height() == 0 {
        bail!("Target candle table is empty");
    }
    if target.column(TIMESTAMP_COLUMN).is_err() {
        bail!("Target candle table has no {} column", TIMESTAMP_COLUMN);
    }
    float_column(target, CLOSE_COLUMN).context("Invalid target candle table")
}

/// Pull every anchor column named by `metadata` out of the anchor frame
pub fn anchor_candles(metadata: &CoinMetadata, anchors: &DataFrame) -> Result<AnchorCandles> {
    let mut candles = AnchorCandles::new();
    for spec in &metadata.anchors {
        let name = spec.close_column();
        let closes = float_column(anchors, &name).context("Invalid anchor candle table")?;
        candles.insert_column(name, closes);
    }
    Ok(candles)
}

/// Run `generator` over DataFrame inputs. Never fails on bad input: the
/// result is all HOLD with the target's height when the frames can't be read.
pub fn generate_frame<G>(generator: &G, target: &DataFrame, anchors: &DataFrame) -> DataFrame
where
    G: SignalGenerator + ?Sized,
{
    let height = target.height();
    let inputs = target_closes(target)
        .and_then(|closes| Ok((closes, anchor_candles(generator.metadata(), anchors)?)));

    let signals = match inputs {
        Ok((closes, candles)) => generator.generate_signals(&closes, &candles),
        Err(e) => {
            warn!(
                "Cannot read candle tables for {}, emitting HOLD for all {} rows: {:#}",
                generator.metadata().target.symbol,
                height,
                e
            );
            all_hold(height)
        }
    };

    let frame = signal_frame(target, &signals)
        .unwrap_or_else(|e| panic!("failed to assemble signal frame: {e:#}"));
    assert_signal_frame(&frame, height);
    frame
}

/// Output frame: target timestamps (nulls when absent) plus signal labels
pub fn signal_frame(target: &DataFrame, signals: &[TradeSignal]) -> Result<DataFrame> {
    let timestamps = match target.column(TIMESTAMP_COLUMN) {
        Ok(column) => column.clone(),
        Err(_) => Column::full_null(TIMESTAMP_COLUMN.into(), signals.len(), &DataType::Int64),
    };
    let labels: Vec<&str> = signals.iter().map(TradeSignal::as_str).collect();
    let signal_column = Column::from(Series::new(SIGNAL_COLUMN.into(), labels));

    DataFrame::new(vec![timestamps, signal_column]).map_err(|e| anyhow!(e))
}

/// Self-check on the output frame; violations are generator defects
pub fn assert_signal_frame(frame: &DataFrame, expected_rows: usize) {
    assert_eq!(
        frame.height(),
        expected_rows,
        "signal frame has {} rows, expected {}",
        frame.height(),
        expected_rows
    );

    let labels = frame
        .column(SIGNAL_COLUMN)
        .and_then(|c| c.as_materialized_series().str().cloned())
        .unwrap_or_else(|e| panic!("signal column unreadable: {e}"));
    assert_eq!(labels.null_count(), 0, "signal column contains nulls");
    for label in (&labels).into_iter().flatten() {
        assert!(
            label.parse::<TradeSignal>().is_ok(),
            "unexpected signal value {label:?}"
        );
    }
}

/// Signals back out of an output frame
pub fn read_signals(frame: &DataFrame) -> Result<Vec<TradeSignal>> {
    let series = frame.column(SIGNAL_COLUMN)?.as_materialized_series();
    series
        .str()?
        .into_iter()
        .map(|label| {
            label
                .ok_or_else(|| anyhow!("Null signal"))
                .and_then(|label| label.parse::<TradeSignal>())
        })
        .collect()
}
