//! Break of structure (BOS) and change of character (CHoCH)

use crate::types::*;

pub struct StructureBreakDetector;

impl StructureBreakDetector {
    /// Structure state at the last close plus the chronological break history.
    ///
    /// `confirm_after` is the swing window length: a swing only becomes a
    /// breakable level once that many candles have printed after it.
    pub fn detect(
        candles: &[Candle],
        swings: &SwingPoints,
        confirm_after: usize,
    ) -> StructureBreakResult {
        let history = Self::history(candles, swings, confirm_after);
        let (Some(last), [.., prev_high, recent_high], [.., prev_low, recent_low]) = (
            candles.last(),
            swings.highs.as_slice(),
            swings.lows.as_slice(),
        ) else {
            return StructureBreakResult {
                history,
                ..Default::default()
            };
        };
        let price = last.close;

        let mut bos = Vec::new();
        if price > recent_high.price {
            bos.push(StructureBreak {
                kind: Direction::Bullish,
                level: recent_high.price,
                broken_at: price,
                signal: Signal::Buy,
                message: format!("Bullish BOS: Price broke above {:.2}", recent_high.price),
            });
        }
        if price < recent_low.price {
            bos.push(StructureBreak {
                kind: Direction::Bearish,
                level: recent_low.price,
                broken_at: price,
                signal: Signal::Sell,
                message: format!("Bearish BOS: Price broke below {:.2}", recent_low.price),
            });
        }

        // A lower high taken out flips bullish; a higher low lost flips bearish
        let mut choch = None;
        if recent_high.price < prev_high.price && price > recent_high.price {
            choch = Some(StructureBreak {
                kind: Direction::Bullish,
                level: recent_high.price,
                broken_at: price,
                signal: Signal::Buy,
                message: "Bullish CHoCH: Potential trend reversal to upside".to_string(),
            });
        }
        if recent_low.price > prev_low.price && price < recent_low.price {
            choch = Some(StructureBreak {
                kind: Direction::Bearish,
                level: recent_low.price,
                broken_at: price,
                signal: Signal::Sell,
                message: "Bearish CHoCH: Potential trend reversal to downside".to_string(),
            });
        }

        StructureBreakResult { bos, choch, history }
    }

    /// Walk the series forward and record every close through an unbroken,
    /// confirmed swing level. Broken levels are consumed.
    pub fn history(
        candles: &[Candle],
        swings: &SwingPoints,
        confirm_after: usize,
    ) -> Vec<StructureEvent> {
        let mut events = Vec::new();
        let mut active_highs: Vec<f64> = Vec::new();
        let mut active_lows: Vec<f64> = Vec::new();
        let (mut next_high, mut next_low) = (0, 0);

        for (k, candle) in candles.iter().enumerate() {
            while let Some(s) = swings
                .highs
                .get(next_high)
                .filter(|s| s.index + confirm_after <= k)
            {
                active_highs.push(s.price);
                next_high += 1;
            }
            while let Some(s) = swings.lows.get(next_low).filter(|s| s.index + confirm_after <= k) {
                active_lows.push(s.price);
                next_low += 1;
            }

            break_levels(&mut active_highs, candle, k, Direction::Bullish, &mut events);
            break_levels(&mut active_lows, candle, k, Direction::Bearish, &mut events);
        }

        events
    }
}

/// Consume every active level the close went through, newest first. The
/// break is a CHoCH when the next older level still standing shows the
/// opposite pattern (lower high for bullish, higher low for bearish).
fn break_levels(
    levels: &mut Vec<f64>,
    candle: &Candle,
    index: usize,
    direction: Direction,
    events: &mut Vec<StructureEvent>,
) {
    let close = candle.close;
    let mut i = levels.len();
    while i > 0 {
        i -= 1;
        let level = levels[i];
        let broken = match direction {
            Direction::Bullish => close > level,
            Direction::Bearish => close < level,
        };
        if !broken {
            continue;
        }

        levels.remove(i);
        let older = i.checked_sub(1).map(|j| levels[j]);
        let reversal = match (direction, older) {
            (Direction::Bullish, Some(prev)) => level < prev,
            (Direction::Bearish, Some(prev)) => level > prev,
            (_, None) => false,
        };

        events.push(StructureEvent {
            kind: if reversal { BreakKind::Choch } else { BreakKind::Bos },
            direction,
            level,
            broken_at: close,
            index,
            timestamp: candle.timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swings::SwingPointDetector;

    fn point(index: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            index,
            price,
            timestamp: index as i64,
            kind,
        }
    }

    fn closes(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Candle {
                timestamp: i as i64,
                open: p,
                high: p + 0.5,
                low: p - 0.5,
                close: p,
                volume: 1.0,
            })
            .collect()
    }

    /// Lows fall to 100 at index 10, recover, pull back to a higher low of
    /// 105 at index 20, rally, then close below 105 and finally below 100.
    fn choch_fixture() -> Vec<Candle> {
        let mut lows: Vec<f64> = Vec::new();
        lows.extend((0..=10).map(|i| 110.0 - i as f64));
        lows.extend((11..=15).map(|i| 100.0 + 2.0 * (i - 10) as f64));
        lows.extend((16..=20).map(|i| 110.0 - (i - 15) as f64));
        lows.extend((21..=29).map(|i| 105.0 + 2.0 * (i - 20) as f64));

        let mut candles: Vec<Candle> = lows
            .iter()
            .enumerate()
            .map(|(i, &low)| Candle {
                timestamp: i as i64 * 60_000,
                open: low + 0.5,
                high: low + 1.0,
                low,
                close: low + 0.5,
                volume: 1.0,
            })
            .collect();
        for (i, close) in [(30, 103.0), (31, 98.0)] {
            candles.push(Candle {
                timestamp: i as i64 * 60_000,
                open: close + 2.0,
                high: close + 2.5,
                low: close - 0.5,
                close,
                volume: 1.0,
            });
        }
        candles
    }

    #[test]
    fn test_choch_precedes_bos_in_history() {
        let candles = choch_fixture();
        let swings = SwingPointDetector::detect(&candles, 5);
        let low_idx: Vec<usize> = swings.lows.iter().map(|s| s.index).collect();
        assert_eq!(low_idx, vec![10, 20]);

        let bearish: Vec<StructureEvent> = StructureBreakDetector::history(&candles, &swings, 5)
            .into_iter()
            .filter(|e| e.direction == Direction::Bearish)
            .collect();

        assert_eq!(bearish.len(), 2);
        assert_eq!(bearish[0].kind, BreakKind::Choch);
        assert_eq!(bearish[0].level, 105.0);
        assert_eq!(bearish[0].index, 30);
        assert_eq!(bearish[1].kind, BreakKind::Bos);
        assert_eq!(bearish[1].level, 100.0);
        assert_eq!(bearish[1].index, 31);
    }

    #[test]
    fn test_levels_not_breakable_before_confirmation() {
        let candles = closes(&[10.0, 9.0, 8.0, 12.0, 7.0]);
        let swings = SwingPoints {
            highs: vec![],
            lows: vec![point(2, 7.5, SwingKind::Low)],
        };
        // Confirmed at index 2 + 3 = 5, after the series ends
        assert!(StructureBreakDetector::history(&candles, &swings, 3).is_empty());
        // Confirmed at index 4, where the close breaks it
        let events = StructureBreakDetector::history(&candles, &swings, 2);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, BreakKind::Bos);
        assert_eq!(events[0].broken_at, 7.0);
    }

    #[test]
    fn test_snapshot_bullish_bos_and_choch() {
        let candles = closes(&[100.0, 105.0, 110.0, 118.0]);
        let swings = SwingPoints {
            highs: vec![point(5, 120.0, SwingKind::High), point(15, 115.0, SwingKind::High)],
            lows: vec![point(10, 100.0, SwingKind::Low), point(20, 95.0, SwingKind::Low)],
        };
        let result = StructureBreakDetector::detect(&candles, &swings, 5);

        assert_eq!(result.bos.len(), 1);
        assert_eq!(result.bos[0].kind, Direction::Bullish);
        assert_eq!(result.bos[0].level, 115.0);
        assert_eq!(result.bos[0].broken_at, 118.0);
        assert!(result.has_choch(Direction::Bullish));
        assert!(!result.has_choch(Direction::Bearish));
    }

    #[test]
    fn test_snapshot_bos_both_directions() {
        let candles = closes(&[104.0, 105.0]);
        let swings = SwingPoints {
            highs: vec![point(1, 98.0, SwingKind::High), point(3, 100.0, SwingKind::High)],
            lows: vec![point(2, 108.0, SwingKind::Low), point(4, 110.0, SwingKind::Low)],
        };
        let result = StructureBreakDetector::detect(&candles, &swings, 5);

        assert_eq!(result.bos.len(), 2);
        assert!(result.has_bos(Direction::Bullish));
        assert!(result.has_bos(Direction::Bearish));
        // Higher low broken: the bearish CHoCH is the single one reported
        assert_eq!(result.choch.as_ref().map(|c| c.kind), Some(Direction::Bearish));
    }

    #[test]
    fn test_snapshot_needs_two_swings_each() {
        let candles = closes(&[100.0, 130.0]);
        let swings = SwingPoints {
            highs: vec![point(0, 120.0, SwingKind::High)],
            lows: vec![point(1, 90.0, SwingKind::Low), point(2, 95.0, SwingKind::Low)],
        };
        let result = StructureBreakDetector::detect(&candles, &swings, 5);
        assert!(result.bos.is_empty());
        assert!(result.choch.is_none());
    }
}
