//! Equal highs / equal lows liquidity pools

use crate::types::*;

pub struct LiquidityZoneDetector;

impl LiquidityZoneDetector {
    pub fn detect(
        swings: &SwingPoints,
        price: f64,
        tolerance: f64,
        max_per_side: usize,
    ) -> LiquidityZones {
        let mut equal_highs = cluster(&swings.highs, price, tolerance, LiquidityKind::Resistance);
        let mut equal_lows = cluster(&swings.lows, price, tolerance, LiquidityKind::Support);
        equal_highs.truncate(max_per_side);
        equal_lows.truncate(max_per_side);

        LiquidityZones {
            nearest_liquidity_above: equal_highs.first().cloned(),
            nearest_liquidity_below: equal_lows.first().cloned(),
            equal_highs,
            equal_lows,
        }
    }
}

/// Pair up swings within `tolerance` of each other, nearest level first
fn cluster(
    points: &[SwingPoint],
    price: f64,
    tolerance: f64,
    kind: LiquidityKind,
) -> Vec<LiquidityZone> {
    let mut zones: Vec<LiquidityZone> = Vec::new();

    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            if a.price == 0.0 || (a.price - b.price).abs() / a.price >= tolerance {
                continue;
            }
            let level = (a.price + b.price) / 2.0;
            if zones
                .iter()
                .any(|z| (z.level - level).abs() / level < tolerance)
            {
                continue;
            }
            zones.push(zone(level, price, kind));
        }
    }

    zones.sort_by(|a, b| a.distance_pct.total_cmp(&b.distance_pct));
    zones
}

fn zone(level: f64, price: f64, kind: LiquidityKind) -> LiquidityZone {
    let (signal, message) = match kind {
        LiquidityKind::Resistance => (
            Signal::Sell,
            format!("Equal Highs at ${:.2} - Liquidity above", level),
        ),
        LiquidityKind::Support => (
            Signal::Buy,
            format!("Equal Lows at ${:.2} - Liquidity below", level),
        ),
    };
    LiquidityZone {
        level,
        kind,
        signal,
        distance_pct: pct_of((price - level).abs(), price),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(prices: &[f64], kind: SwingKind) -> Vec<SwingPoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| SwingPoint {
                index: i * 10,
                price,
                timestamp: i as i64,
                kind,
            })
            .collect()
    }

    #[test]
    fn test_equal_highs_pair() {
        let swings = SwingPoints {
            highs: points(&[100.0, 110.0, 100.4], SwingKind::High),
            lows: vec![],
        };
        let zones = LiquidityZoneDetector::detect(&swings, 95.0, 0.005, 5);

        assert_eq!(zones.equal_highs.len(), 1);
        let eqh = &zones.equal_highs[0];
        assert!((eqh.level - 100.2).abs() < 1e-9);
        assert_eq!(eqh.kind, LiquidityKind::Resistance);
        assert_eq!(eqh.signal, Signal::Sell);
        assert_eq!(eqh.message, "Equal Highs at $100.20 - Liquidity above");
        assert_eq!(zones.nearest_liquidity_above.as_ref(), Some(eqh));
        assert!(zones.equal_lows.is_empty());
        assert!(zones.nearest_liquidity_below.is_none());
    }

    #[test]
    fn test_tolerance_is_strict() {
        // Exactly 0.5% apart does not pair
        let swings = SwingPoints {
            highs: vec![],
            lows: points(&[100.0, 100.5], SwingKind::Low),
        };
        let zones = LiquidityZoneDetector::detect(&swings, 100.0, 0.005, 5);
        assert!(zones.equal_lows.is_empty());
    }

    #[test]
    fn test_near_duplicate_levels_recorded_once() {
        let swings = SwingPoints {
            highs: vec![],
            lows: points(&[50.0, 50.1, 50.05], SwingKind::Low),
        };
        let zones = LiquidityZoneDetector::detect(&swings, 60.0, 0.005, 5);

        assert_eq!(zones.equal_lows.len(), 1);
        assert_eq!(zones.equal_lows[0].kind, LiquidityKind::Support);
        assert_eq!(zones.equal_lows[0].message, "Equal Lows at $50.05 - Liquidity below");
    }

    #[test]
    fn test_sorted_by_distance_and_capped() {
        let prices: Vec<f64> = (0..8)
            .flat_map(|i| {
                let base = 100.0 + i as f64 * 10.0;
                [base, base + 0.1]
            })
            .collect();
        let swings = SwingPoints {
            highs: points(&prices, SwingKind::High),
            lows: vec![],
        };
        let zones = LiquidityZoneDetector::detect(&swings, 150.0, 0.005, 5);

        assert_eq!(zones.equal_highs.len(), 5);
        assert!(zones
            .equal_highs
            .windows(2)
            .all(|w| w[0].distance_pct <= w[1].distance_pct));
        assert!((zones.equal_highs[0].level - 150.05).abs() < 1e-9);
    }
}
