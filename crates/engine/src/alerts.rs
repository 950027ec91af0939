//! Prioritised alerts derived from every detector output

use crate::types::*;

const OB_HIGH_DISTANCE_PCT: f64 = 1.5;
const OB_MEDIUM_DISTANCE_PCT: f64 = 3.0;
const FVG_ALERT_DISTANCE_PCT: f64 = 2.0;

pub struct AlertGenerator;

impl AlertGenerator {
    /// One alert per qualifying structure, most severe first
    pub fn generate(
        order_blocks: &[OrderBlock],
        fair_value_gaps: &[FairValueGap],
        structure: &StructureBreakResult,
        zones: Option<&PremiumDiscountZone>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for ob in order_blocks {
            let priority = if ob.in_zone {
                AlertPriority::Critical
            } else if ob.distance_pct <= OB_HIGH_DISTANCE_PCT {
                AlertPriority::High
            } else if ob.distance_pct <= OB_MEDIUM_DISTANCE_PCT {
                AlertPriority::Medium
            } else {
                continue;
            };
            alerts.push(Alert {
                kind: match ob.kind {
                    Direction::Bullish => AlertKind::OrderBlockBullish,
                    Direction::Bearish => AlertKind::OrderBlockBearish,
                },
                signal: ob.signal,
                priority,
                message: format!(
                    "{} Zone #{} at ${:.2} ({:.1}% away)",
                    ob.signal.label(),
                    ob.rank,
                    ob.mid,
                    ob.distance_pct
                ),
                level: ob.mid,
                distance_pct: ob.distance_pct,
            });
        }

        for fvg in fair_value_gaps
            .iter()
            .filter(|g| g.distance_pct <= FVG_ALERT_DISTANCE_PCT)
        {
            alerts.push(Alert {
                kind: match fvg.kind {
                    Direction::Bullish => AlertKind::FvgBullish,
                    Direction::Bearish => AlertKind::FvgBearish,
                },
                signal: fvg.signal,
                priority: AlertPriority::Medium,
                message: format!(
                    "FVG {} at ${:.2} ({:.1}% away)",
                    fvg.signal.label(),
                    fvg.mid,
                    fvg.distance_pct
                ),
                level: fvg.mid,
                distance_pct: fvg.distance_pct,
            });
        }

        for bos in &structure.bos {
            alerts.push(Alert {
                kind: match bos.kind {
                    Direction::Bullish => AlertKind::BosBullish,
                    Direction::Bearish => AlertKind::BosBearish,
                },
                signal: bos.signal,
                priority: AlertPriority::High,
                message: bos.message.clone(),
                level: bos.level,
                distance_pct: 0.0,
            });
        }

        if let Some(choch) = &structure.choch {
            alerts.push(Alert {
                kind: match choch.kind {
                    Direction::Bullish => AlertKind::ChochBullish,
                    Direction::Bearish => AlertKind::ChochBearish,
                },
                signal: choch.signal,
                priority: AlertPriority::Critical,
                message: choch.message.clone(),
                level: choch.level,
                distance_pct: 0.0,
            });
        }

        if let Some(zone) = zones {
            alerts.push(Alert {
                kind: match zone.current_zone {
                    PriceZone::Premium => AlertKind::ZonePremium,
                    PriceZone::Discount => AlertKind::ZoneDiscount,
                },
                signal: zone.zone_signal,
                priority: AlertPriority::Low,
                message: zone.zone_message.clone(),
                level: zone.equilibrium,
                distance_pct: 0.0,
            });
        }

        // Stable: equal priorities keep detector order
        alerts.sort_by_key(|a| a.priority);
        alerts
    }
}
