use anchor_signals::config::GeneratorConfig;
use anchor_signals::frame::{self, TIMESTAMP_COLUMN};
use anchor_signals::metadata::{AssetSpec, CoinMetadata};
use anchor_signals::signals::{
    LaggedAnchorGenerator, RuleSignalGenerator, RuleStrategyConfig, SignalCounts,
    SignalGenerator,
};

use anyhow::Result;
use log::info;
use polars::prelude::*;
use std::env;

const DEMO_ROWS: usize = 400;
const DEMO_START_MS: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

/// Deterministic price path per symbol; the phase is derived from the symbol
/// so every anchor moves differently
fn synthetic_closes(symbol: &str, shift: usize) -> Vec<f64> {
    let phase = symbol.bytes().map(f64::from).sum::<f64>() % 7.0;
    let base = 10.0 + phase * 100.0;
    (0..DEMO_ROWS)
        .map(|i| {
            let t = i.saturating_sub(shift) as f64;
            base * (1.0 + 0.04 * (t * 0.21 + phase).sin() + 0.01 * (t * 0.05).cos())
        })
        .collect()
}

fn demo_frames(
    target: &AssetSpec,
    anchors: &[AssetSpec],
    lead: &str,
) -> Result<(DataFrame, DataFrame)> {
    let step_ms = target.timeframe.duration().num_milliseconds();
    let timestamps: Vec<i64> = (0..DEMO_ROWS as i64)
        .map(|i| DEMO_START_MS + i * step_ms)
        .collect();

    // The target replays the lead anchor two candles late
    let target_closes = synthetic_closes(lead, 2);
    let target_df = DataFrame::new(vec![
        Column::from(Series::new(TIMESTAMP_COLUMN.into(), timestamps)),
        Column::from(Series::new("close".into(), target_closes)),
    ])?;

    let anchor_columns = anchors
        .iter()
        .map(|spec| {
            let closes = synthetic_closes(&spec.symbol, 0);
            Column::from(Series::new(spec.close_column().into(), closes))
        })
        .collect::<Vec<_>>();
    let anchor_df = DataFrame::new(anchor_columns)?;

    Ok((target_df, anchor_df))
}

fn run_generator<G: SignalGenerator>(name: &str, generator: &G, lead: &str) -> Result<()> {
    let metadata: &CoinMetadata = generator.metadata();
    info!("{} metadata: {}", name, serde_json::to_string(metadata)?);

    let (target_df, anchor_df) = demo_frames(&metadata.target, &metadata.anchors, lead)?;
    let signals_df = frame::generate_frame(generator, &target_df, &anchor_df);

    let counts = SignalCounts::from_signals(&frame::read_signals(&signals_df)?);
    info!(
        "{}: {} rows, {} BUY, {} SELL, {} HOLD",
        name,
        counts.total(),
        counts.buy,
        counts.sell,
        counts.hold
    );
    println!("{}", signals_df.tail(Some(10)));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting anchor signal demo");

    // Usage: anchor-signals [config.json] [rules.json]
    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            GeneratorConfig::load_from_file(path)?
        }
        None => GeneratorConfig::load()?,
    };

    let lagged = LaggedAnchorGenerator::from_config(config)?;
    let signal = lagged.config();
    info!(
        "Entry {:.2}%, exit {:.2}%, weights {:?}",
        signal.entry_threshold * 100.0,
        signal.exit_threshold * 100.0,
        signal.anchor_weights
    );
    let lead = lagged
        .metadata()
        .anchors
        .first()
        .map(|a| a.symbol.clone())
        .unwrap_or_default();
    run_generator("lagged-anchor", &lagged, &lead)?;

    let rule_config = match args.get(2) {
        Some(path) => RuleStrategyConfig::load_from_file(path)?,
        None => RuleStrategyConfig::default(),
    };
    let rules = RuleSignalGenerator::new(rule_config)?;
    let rule_lead = rules
        .config()
        .buy_rules
        .first()
        .map(|r| r.symbol.clone())
        .unwrap_or_default();
    run_generator("rule-based", &rules, &rule_lead)?;

    Ok(())
}
