use anyhow::Result;

use anchor_signals::market_data::{AnchorCandles, TimeFrame};
use anchor_signals::metadata::AssetSpec;
use anchor_signals::signals::{
    Direction, PriceRule, RuleSignalGenerator, RuleStrategyConfig, SignalGenerator, TradeSignal,
};
use anchor_signals::signals::rules::AnchorRef;

#[cfg(test)]
mod rules_tests {
    use super::*;

    const ROWS: usize = 20;

    fn rule(symbol: &str, lag: usize, change_pct: f64, direction: Direction) -> PriceRule {
        PriceRule {
            symbol: symbol.to_string(),
            timeframe: TimeFrame::Hours1,
            lag,
            change_pct,
            direction,
        }
    }

    fn anchor(symbol: &str, lag: usize) -> AnchorRef {
        AnchorRef {
            symbol: symbol.to_string(),
            timeframe: TimeFrame::Hours1,
            lag,
        }
    }

    /// BUY when BTC and ETH both rallied 2 candles ago, SELL when ETH drops
    fn setup_generator() -> RuleSignalGenerator {
        let config = RuleStrategyConfig {
            target: AssetSpec::new("LDO", TimeFrame::Hours1),
            anchors: vec![anchor("BTC", 2), anchor("ETH", 2)],
            buy_rules: vec![
                rule("BTC", 2, 3.0, Direction::Up),
                rule("ETH", 2, 5.0, Direction::Up),
            ],
            sell_rules: vec![rule("ETH", 0, -3.0, Direction::Down)],
        };
        RuleSignalGenerator::new(config).unwrap()
    }

    fn path(moves: &[(usize, f64)]) -> Vec<f64> {
        let mut price = 100.0;
        (0..ROWS)
            .map(|i| {
                if let Some((_, pct)) = moves.iter().find(|(at, _)| *at == i) {
                    price *= 1.0 + pct / 100.0;
                }
                price
            })
            .collect()
    }

    fn candles(btc: &[f64], eth: &[f64]) -> AnchorCandles {
        AnchorCandles::new()
            .with_closes("BTC", TimeFrame::Hours1, btc)
            .with_closes("ETH", TimeFrame::Hours1, eth)
    }

    fn target() -> Vec<Option<f64>> {
        vec![Some(1.0); ROWS]
    }

    #[test]
    fn test_all_buy_rules_must_pass() -> Result<()> {
        let generator = setup_generator();
        let btc = path(&[(5, 4.0), (10, 4.0)]);
        let eth = path(&[(5, 6.0), (10, 4.0)]);

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;

        // Both rallies land at 5, only BTC clears its bar at 10
        assert_eq!(signals[7], TradeSignal::Buy);
        assert_eq!(signals[12], TradeSignal::Hold);
        assert_eq!(
            signals.iter().filter(|s| **s == TradeSignal::Buy).count(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_any_sell_rule_triggers() -> Result<()> {
        let generator = setup_generator();
        let btc = path(&[]);
        let eth = path(&[(8, -3.5)]);

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;

        assert_eq!(signals[8], TradeSignal::Sell);
        assert_eq!(
            signals.iter().filter(|s| **s == TradeSignal::Sell).count(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_buy_takes_precedence_over_sell() -> Result<()> {
        let generator = setup_generator();
        // ETH rallies at 5 then drops at 7, the same row the buy rules see the rally
        let btc = path(&[(5, 4.0)]);
        let eth = path(&[(5, 6.0), (7, -4.0)]);

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;
        assert_eq!(signals[7], TradeSignal::Buy);
        Ok(())
    }

    #[test]
    fn test_missing_price_fails_buy_rules() -> Result<()> {
        let generator = setup_generator();
        let btc: Vec<Option<f64>> = path(&[(5, 4.0)])
            .into_iter()
            .enumerate()
            .map(|(i, p)| if i == 7 { None } else { Some(p) })
            .collect();
        let eth = path(&[(5, 6.0)]);

        let mut anchors = AnchorCandles::new().with_closes("ETH", TimeFrame::Hours1, &eth);
        anchors.insert_column("close_BTC_1H", btc);

        let signals = generator.try_generate_signals(&target(), &anchors)?;
        assert_eq!(signals[7], TradeSignal::Hold);
        Ok(())
    }

    #[test]
    fn test_sell_rule_skips_change_after_zero_close() -> Result<()> {
        let generator = setup_generator();
        let btc = vec![100.0; ROWS];
        let eth: Vec<f64> = (0..ROWS).map(|i| if i == 8 { 0.0 } else { 100.0 }).collect();

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;

        // The drop to zero triggers; the rebound from zero has no defined change
        assert_eq!(signals[8], TradeSignal::Sell);
        assert_eq!(signals[9], TradeSignal::Hold);
        assert_eq!(
            signals.iter().filter(|s| **s == TradeSignal::Sell).count(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_sell_rule_lag_beyond_series_never_triggers() -> Result<()> {
        let config = RuleStrategyConfig {
            target: AssetSpec::new("LDO", TimeFrame::Hours1),
            anchors: vec![anchor("BTC", 2), anchor("ETH", ROWS + 5)],
            buy_rules: vec![rule("BTC", 2, 3.0, Direction::Up)],
            sell_rules: vec![rule("ETH", ROWS + 5, -3.0, Direction::Down)],
        };
        let generator = RuleSignalGenerator::new(config)?;
        let btc = vec![100.0; ROWS];
        let eth = path(&[(3, -50.0), (10, -50.0)]);

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;
        assert_eq!(signals, vec![TradeSignal::Hold; ROWS]);
        Ok(())
    }

    #[test]
    fn test_warm_up_rows_are_hold() -> Result<()> {
        let generator = setup_generator();
        let btc = path(&[(1, 10.0)]);
        let eth = path(&[(1, 10.0)]);

        let signals = generator.try_generate_signals(&target(), &candles(&btc, &eth))?;
        // Row 2 would read the change at row 0, which is undefined
        assert_eq!(
            &signals[..4],
            &[
                TradeSignal::Hold,
                TradeSignal::Hold,
                TradeSignal::Hold,
                TradeSignal::Buy
            ]
        );
        Ok(())
    }

    #[test]
    fn test_missing_column_degrades_to_hold() -> Result<()> {
        let generator = setup_generator();
        let btc = path(&[(5, 4.0)]);
        let only_btc = AnchorCandles::new().with_closes("BTC", TimeFrame::Hours1, &btc);

        assert!(generator.try_generate_signals(&target(), &only_btc).is_err());
        let signals = generator.generate_signals(&target(), &only_btc);
        assert_eq!(signals, vec![TradeSignal::Hold; ROWS]);
        Ok(())
    }

    #[test]
    fn test_default_template_strategy_runs() -> Result<()> {
        let generator = RuleSignalGenerator::new(RuleStrategyConfig::default())?;
        let flat = vec![100.0; ROWS];
        let anchors = AnchorCandles::new()
            .with_closes("BTC", TimeFrame::Hours1, &flat)
            .with_closes("ETH", TimeFrame::Hours1, &flat)
            .with_closes("ETH", TimeFrame::Hours4, &path(&[(9, -5.0)]));

        let signals = generator.generate_signals(&target(), &anchors);
        assert_eq!(signals[9], TradeSignal::Sell);
        assert_eq!(
            signals.iter().filter(|s| **s == TradeSignal::Hold).count(),
            ROWS - 1
        );
        Ok(())
    }
}
