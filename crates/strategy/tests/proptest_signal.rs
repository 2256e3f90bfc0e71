use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use common::{Candle, Signal};
use strategy::{EmaRsiStrategy, Strategy};

fn candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            open_time: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            interval_seconds: 60,
        })
        .collect()
}

proptest! {
    /// Evaluation on arbitrary windows must never panic and must be repeatable.
    #[test]
    fn evaluate_is_total_and_deterministic(
        closes in prop::collection::vec(0.01f64..10_000.0f64, 0..80),
    ) {
        let strategy = EmaRsiStrategy::default();
        let window = candles(&closes);
        let first = strategy.evaluate(&window);
        let second = strategy.evaluate(&window);
        prop_assert_eq!(first, second);
    }

    /// RSI stays within its 0..=100 bounds wherever it is defined.
    #[test]
    fn rsi_is_bounded(
        closes in prop::collection::vec(0.01f64..10_000.0f64, 16..80),
    ) {
        let strategy = EmaRsiStrategy::default();
        let series = strategy.indicators(&candles(&closes));
        for value in series.rsi.iter().flatten() {
            prop_assert!((0.0..=100.0).contains(value), "rsi out of range: {}", value);
        }
    }

    /// A fired signal always comes with its RSI confirmation.
    #[test]
    fn signals_respect_rsi_thresholds(
        closes in prop::collection::vec(1.0f64..200.0f64, 16..80),
    ) {
        let strategy = EmaRsiStrategy::default();
        let window = candles(&closes);
        let signal = strategy.evaluate(&window);
        if signal != Signal::None {
            let (_, latest) = strategy.indicators(&window).last_two().unwrap();
            match signal {
                Signal::Buy => prop_assert!(latest.rsi < 30.0),
                Signal::Sell => prop_assert!(latest.rsi > 70.0),
                Signal::None => {}
            }
        }
    }
}
