//! Premium / discount zones and the Fibonacci ladder of the recent range

use crate::types::*;

/// Retracement ratios reported in the ladder, range low to range high
pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Range of the last `swing_count` highs and lows, or None without swings
    pub fn calculate(
        swings: &SwingPoints,
        price: f64,
        swing_count: usize,
    ) -> Option<PremiumDiscountZone> {
        if swings.highs.is_empty() || swings.lows.is_empty() {
            return None;
        }

        let recent = |points: &[SwingPoint]| -> Vec<f64> {
            points[points.len().saturating_sub(swing_count)..]
                .iter()
                .map(|p| p.price)
                .collect()
        };
        let range_high = recent(&swings.highs)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max);
        let range_low = recent(&swings.lows)
            .into_iter()
            .fold(f64::INFINITY, f64::min);
        let range = range_high - range_low;
        let equilibrium = (range_high + range_low) / 2.0;

        let fibonacci = FIB_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: range_low + range * ratio,
            })
            .collect();

        let (current_zone, zone_signal, zone_message) = if price >= equilibrium {
            (
                PriceZone::Premium,
                Signal::Sell,
                "Price in Premium Zone - Look for sells",
            )
        } else {
            (
                PriceZone::Discount,
                Signal::Buy,
                "Price in Discount Zone - Look for buys",
            )
        };

        Some(PremiumDiscountZone {
            premium: Band {
                high: range_high,
                low: equilibrium,
            },
            discount: Band {
                high: equilibrium,
                low: range_low,
            },
            equilibrium,
            current_zone,
            zone_signal,
            zone_message: zone_message.to_string(),
            fibonacci,
            range_pct: pct_of(range, range_low),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swings(highs: &[f64], lows: &[f64]) -> SwingPoints {
        let point = |(i, &price): (usize, &f64), kind| SwingPoint {
            index: i,
            price,
            timestamp: i as i64,
            kind,
        };
        SwingPoints {
            highs: highs.iter().enumerate().map(|p| point(p, SwingKind::High)).collect(),
            lows: lows.iter().enumerate().map(|p| point(p, SwingKind::Low)).collect(),
        }
    }

    #[test]
    fn test_discount_zone() {
        let zone = ZoneCalculator::calculate(&swings(&[120.0, 110.0], &[100.0, 105.0]), 104.0, 5)
            .expect("zone");

        assert_eq!(zone.equilibrium, 110.0);
        assert_eq!(zone.premium, Band { high: 120.0, low: 110.0 });
        assert_eq!(zone.discount, Band { high: 110.0, low: 100.0 });
        assert_eq!(zone.current_zone, PriceZone::Discount);
        assert_eq!(zone.zone_signal, Signal::Buy);
        assert_eq!(zone.zone_message, "Price in Discount Zone - Look for buys");
        assert!((zone.range_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_equilibrium_counts_as_premium() {
        let zone = ZoneCalculator::calculate(&swings(&[120.0], &[100.0]), 110.0, 5).expect("zone");
        assert_eq!(zone.current_zone, PriceZone::Premium);
        assert_eq!(zone.zone_signal, Signal::Sell);
    }

    #[test]
    fn test_fibonacci_ladder() {
        let zone = ZoneCalculator::calculate(&swings(&[200.0], &[100.0]), 150.0, 5).expect("zone");
        let prices: Vec<f64> = zone.fibonacci.iter().map(|f| f.price).collect();
        let expected = [100.0, 123.6, 138.2, 150.0, 161.8, 178.6, 200.0];

        assert_eq!(prices.len(), expected.len());
        for (got, want) in prices.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }
    }

    #[test]
    fn test_only_recent_swings_define_range() {
        // The old extremes fall outside the last two swings
        let zone = ZoneCalculator::calculate(
            &swings(&[500.0, 120.0, 118.0], &[10.0, 100.0, 102.0]),
            110.0,
            2,
        )
        .expect("zone");
        assert_eq!(zone.premium.high, 120.0);
        assert_eq!(zone.discount.low, 100.0);
    }

    #[test]
    fn test_no_swings_no_zone() {
        assert!(ZoneCalculator::calculate(&swings(&[120.0], &[]), 110.0, 5).is_none());
        assert!(ZoneCalculator::calculate(&SwingPoints::default(), 110.0, 5).is_none());
    }
}
