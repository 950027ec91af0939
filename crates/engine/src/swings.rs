//! Fractal swing points and HH/HL trend classification

use crate::types::*;

/// Swings per side considered by the trend classifier
const TREND_SWING_COUNT: usize = 4;

pub struct SwingPointDetector;

impl SwingPointDetector {
    /// Find swing highs/lows confirmed by `length` candles on both sides.
    ///
    /// Equal extrema inside one window all qualify; nothing is deduplicated.
    pub fn detect(candles: &[Candle], length: usize) -> SwingPoints {
        let mut swings = SwingPoints::default();
        if length == 0 || candles.len() < 2 * length + 1 {
            return swings;
        }

        for i in length..candles.len() - length {
            let window = &candles[i - length..=i + length];
            let candle = &candles[i];

            let max_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            if candle.high == max_high {
                swings.highs.push(SwingPoint {
                    index: i,
                    price: candle.high,
                    timestamp: candle.timestamp,
                    kind: SwingKind::High,
                });
            }

            let min_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            if candle.low == min_low {
                swings.lows.push(SwingPoint {
                    index: i,
                    price: candle.low,
                    timestamp: candle.timestamp,
                    kind: SwingKind::Low,
                });
            }
        }

        swings
    }
}

/// Count rises and falls between consecutive points
fn count_moves(points: &[SwingPoint]) -> (u32, u32) {
    points.windows(2).fold((0, 0), |(up, down), w| {
        if w[1].price > w[0].price {
            (up + 1, down)
        } else if w[1].price < w[0].price {
            (up, down + 1)
        } else {
            (up, down)
        }
    })
}

fn tail(points: &[SwingPoint], n: usize) -> &[SwingPoint] {
    &points[points.len().saturating_sub(n)..]
}

pub struct TrendClassifier;

impl TrendClassifier {
    pub fn classify(swings: &SwingPoints) -> TrendResult {
        if swings.highs.len() < 2 || swings.lows.len() < 2 {
            return TrendResult::undefined();
        }

        let (hh, lh) = count_moves(tail(&swings.highs, TREND_SWING_COUNT));
        let (hl, ll) = count_moves(tail(&swings.lows, TREND_SWING_COUNT));

        let bullish = hh + hl;
        let bearish = lh + ll;

        let (direction, structure) = if bullish > bearish + 1 {
            (TrendDirection::Bullish, MarketStructure::HigherHighsHigherLows)
        } else if bearish > bullish + 1 {
            (TrendDirection::Bearish, MarketStructure::LowerHighsLowerLows)
        } else {
            (TrendDirection::Neutral, MarketStructure::Ranging)
        };

        let strength = bullish.abs_diff(bearish) as f64 / (bullish + bearish).max(1) as f64;

        TrendResult {
            direction,
            strength,
            structure,
            hh_count: hh,
            hl_count: hl,
            lh_count: lh,
            ll_count: ll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Candles whose high/low oscillate around a drifting center
    fn wave_candles(n: usize, drift: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let center = 100.0 + drift * i as f64 + 5.0 * ((i as f64) * 0.5).sin();
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: center - 0.2,
                    high: center + 1.0,
                    low: center - 1.0,
                    close: center + 0.2,
                    volume: 100.0,
                }
            })
            .collect()
    }

    fn point(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index,
            price,
            timestamp: index as i64,
            kind,
        }
    }

    #[test]
    fn test_single_peak_is_swing_high() {
        let highs = [1.0, 2.0, 3.0, 9.0, 3.0, 2.0, 1.0];
        let candles: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Candle {
                timestamp: i as i64,
                open: h - 0.5,
                high: h,
                low: h - 1.0,
                close: h - 0.5,
                volume: 1.0,
            })
            .collect();

        let swings = SwingPointDetector::detect(&candles, 3);
        assert_eq!(swings.highs.len(), 1);
        assert_eq!(swings.highs[0].index, 3);
        assert_eq!(swings.highs[0].price, 9.0);
    }

    #[test]
    fn test_equal_highs_both_qualify() {
        let highs = [1.0, 5.0, 5.0, 1.0, 1.0];
        let candles: Vec<Candle> = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| Candle {
                timestamp: i as i64,
                open: 0.5,
                high: h,
                low: 0.0,
                close: 0.5,
                volume: 1.0,
            })
            .collect();

        let swings = SwingPointDetector::detect(&candles, 1);
        let idx: Vec<usize> = swings.highs.iter().map(|s| s.index).collect();
        assert_eq!(idx, vec![1, 2]);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let candles = wave_candles(80, 0.3);
        assert_eq!(
            SwingPointDetector::detect(&candles, 5),
            SwingPointDetector::detect(&candles, 5)
        );
    }

    #[test]
    fn test_short_series_has_no_swings() {
        let swings = SwingPointDetector::detect(&wave_candles(8, 0.0), 5);
        assert!(swings.highs.is_empty());
        assert!(swings.lows.is_empty());
    }

    #[test]
    fn test_rising_waves_classify_bullish() {
        let swings = SwingPointDetector::detect(&wave_candles(120, 0.5), 3);
        let trend = TrendClassifier::classify(&swings);
        assert_eq!(trend.direction, TrendDirection::Bullish);
        assert_eq!(trend.structure, MarketStructure::HigherHighsHigherLows);
        assert!(trend.strength > 0.5);
    }

    #[test]
    fn test_falling_points_classify_bearish() {
        let swings = SwingPoints {
            highs: vec![
                point(5, 120.0, SwingKind::High),
                point(15, 115.0, SwingKind::High),
                point(25, 110.0, SwingKind::High),
            ],
            lows: vec![
                point(10, 100.0, SwingKind::Low),
                point(20, 95.0, SwingKind::Low),
                point(30, 90.0, SwingKind::Low),
            ],
        };
        let trend = TrendClassifier::classify(&swings);
        assert_eq!(trend.direction, TrendDirection::Bearish);
        assert_eq!(trend.lh_count, 2);
        assert_eq!(trend.ll_count, 2);
        assert_eq!(trend.strength, 1.0);
    }

    #[test]
    fn test_single_swing_is_undefined() {
        let swings = SwingPoints {
            highs: vec![point(5, 120.0, SwingKind::High)],
            lows: vec![point(10, 100.0, SwingKind::Low), point(20, 90.0, SwingKind::Low)],
        };
        let trend = TrendClassifier::classify(&swings);
        assert_eq!(trend, TrendResult::undefined());
    }

    #[test]
    fn test_mixed_points_are_neutral() {
        let swings = SwingPoints {
            highs: vec![point(5, 120.0, SwingKind::High), point(15, 125.0, SwingKind::High)],
            lows: vec![point(10, 100.0, SwingKind::Low), point(20, 95.0, SwingKind::Low)],
        };
        let trend = TrendClassifier::classify(&swings);
        assert_eq!(trend.direction, TrendDirection::Neutral);
        assert_eq!(trend.structure, MarketStructure::Ranging);
        assert_eq!(trend.strength, 0.0);
    }
}
