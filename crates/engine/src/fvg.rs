//! Fair value gap (three-candle imbalance) detection

use crate::types::*;

/// Lows and highs strictly after each index: (min low, max high)
fn later_range(candles: &[Candle]) -> Vec<(f64, f64)> {
    let mut range = vec![(f64::INFINITY, f64::NEG_INFINITY); candles.len()];
    for j in (0..candles.len().saturating_sub(1)).rev() {
        let (next_min, next_max) = range[j + 1];
        let next = &candles[j + 1];
        range[j] = (next_min.min(next.low), next_max.max(next.high));
    }
    range
}

pub struct FairValueGapDetector;

impl FairValueGapDetector {
    /// Unfilled gaps of at least `min_gap_pct`, nearest first, at most `max_gaps`.
    ///
    /// A bullish gap is filled once a later low reaches its lower edge, a
    /// bearish gap once a later high reaches its upper edge.
    pub fn detect(candles: &[Candle], min_gap_pct: f64, max_gaps: usize) -> Vec<FairValueGap> {
        let Some(last) = candles.last() else {
            return Vec::new();
        };
        let price = last.close;
        let later = later_range(candles);
        let mut gaps = Vec::new();

        for i in 2..candles.len() {
            let first = &candles[i - 2];
            let third = &candles[i];
            let (later_low, later_high) = later[i];

            if third.low > first.high {
                let (low, high) = (first.high, third.low);
                let gap_pct = pct_of(high - low, low);
                if gap_pct >= min_gap_pct && later_low > low {
                    gaps.push(Self::gap(Direction::Bullish, high, low, gap_pct, price, i, third));
                }
            }

            if third.high < first.low {
                let (low, high) = (third.high, first.low);
                let gap_pct = pct_of(high - low, high);
                if gap_pct >= min_gap_pct && later_high < high {
                    gaps.push(Self::gap(Direction::Bearish, high, low, gap_pct, price, i, third));
                }
            }
        }

        gaps.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        gaps.truncate(max_gaps);
        gaps
    }

    fn gap(
        kind: Direction,
        high: f64,
        low: f64,
        gap_pct: f64,
        price: f64,
        index: usize,
        candle: &Candle,
    ) -> FairValueGap {
        let mid = (high + low) / 2.0;
        let distance = (price - mid).abs();
        FairValueGap {
            kind,
            signal: kind.signal(),
            high,
            low,
            mid,
            gap_pct,
            distance,
            distance_pct: pct_of(distance, price),
            index,
            timestamp: candle.timestamp,
            filled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn bar(i: usize, low: f64, high: f64) -> Candle {
        let mid = (low + high) / 2.0;
        Candle {
            timestamp: i as i64 * 60_000,
            open: mid,
            high,
            low,
            close: mid,
            volume: 100.0,
        }
    }

    #[test]
    fn test_single_bullish_gap() {
        let candles = vec![bar(0, 9.5, 10.0), bar(1, 10.0, 10.8), bar(2, 10.5, 11.0)];
        let gaps = FairValueGapDetector::detect(&candles, 0.1, 10);

        assert_eq!(gaps.len(), 1);
        let gap = &gaps[0];
        assert_eq!(gap.kind, Direction::Bullish);
        assert_eq!(gap.low, 10.0);
        assert_eq!(gap.high, 10.5);
        assert_eq!(gap.mid, 10.25);
        assert!((gap.gap_pct - 5.0).abs() < 1e-9);
        assert!(!gap.filled);
    }

    #[test]
    fn test_bearish_gap() {
        let candles = vec![bar(0, 20.0, 21.0), bar(1, 18.5, 20.5), bar(2, 18.0, 19.0)];
        let gaps = FairValueGapDetector::detect(&candles, 0.1, 10);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, Direction::Bearish);
        assert_eq!(gaps[0].signal, Signal::Sell);
        assert_eq!(gaps[0].high, 20.0);
        assert_eq!(gaps[0].low, 19.0);
        assert!((gaps[0].gap_pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_gap_below_threshold() {
        let candles = vec![bar(0, 99.0, 100.0), bar(1, 100.0, 101.0), bar(2, 100.05, 101.0)];
        assert!(FairValueGapDetector::detect(&candles, 0.1, 10).is_empty());
    }

    #[test]
    fn test_filled_gap_excluded() {
        let mut candles = vec![bar(0, 9.5, 10.0), bar(1, 10.0, 10.8), bar(2, 10.5, 11.0)];
        candles.push(bar(3, 10.6, 11.2));
        assert_eq!(FairValueGapDetector::detect(&candles, 0.1, 10).len(), 1);

        // Trading back down to the gap's lower edge fills it
        candles.push(bar(4, 10.0, 10.9));
        assert!(FairValueGapDetector::detect(&candles, 0.1, 10).is_empty());
    }

    #[test]
    fn test_sorted_by_distance_and_truncated() {
        // Staircase of bullish gaps; the latest gaps sit closest to price
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                bar(i, base, base + 1.5)
            })
            .collect();
        let gaps = FairValueGapDetector::detect(&candles, 0.1, 10);

        assert_eq!(gaps.len(), 10);
        assert!(gaps.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(gaps[0].index, 29);
    }

    #[quickcheck]
    fn prop_detection_is_idempotent(bars: Vec<(u8, u8)>) -> bool {
        let candles: Vec<Candle> = bars
            .iter()
            .enumerate()
            .map(|(i, &(low, width))| bar(i, 50.0 + low as f64, 50.0 + low as f64 + width as f64))
            .collect();
        FairValueGapDetector::detect(&candles, 0.1, 10)
            == FairValueGapDetector::detect(&candles, 0.1, 10)
    }
}
