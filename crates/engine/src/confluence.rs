//! Confluence scoring for a single order block

use crate::types::*;

/// Market context an order block is scored against
#[derive(Debug, Clone, Copy)]
pub struct ConfluenceContext<'a> {
    pub trend: &'a TrendResult,
    pub ema_trend: &'a EmaTrend,
    pub rsi: f64,
    pub zones: Option<&'a PremiumDiscountZone>,
    pub structure: &'a StructureBreakResult,
}

pub struct ConfluenceScorer;

impl ConfluenceScorer {
    pub fn score(block: &OrderBlock, ctx: &ConfluenceContext<'_>) -> ConfluenceResult {
        let direction = block.kind;

        let factors = ConfluenceFactors {
            quality: (block.quality_score * 0.3).min(30.0),
            trend_alignment: alignment_points(ctx.trend.direction, direction, [20.0, 10.0, 5.0]),
            ema_alignment: alignment_points(
                ctx.ema_trend.trend.as_trend(),
                direction,
                [15.0, 8.0, 3.0],
            ),
            rsi_confirmation: rsi_points(ctx.rsi, direction),
            zone_position: zone_points(ctx.zones, direction),
            structure_confirmation: structure_points(ctx.structure, direction),
        };

        let score = (factors.quality
            + factors.trend_alignment
            + factors.ema_alignment
            + factors.rsi_confirmation
            + factors.zone_position
            + factors.structure_confirmation)
            .clamp(0.0, 100.0);

        ConfluenceResult {
            score,
            strength: ConfluenceStrength::from_score(score),
            factors,
        }
    }
}

/// `[aligned, neutral, opposed]` points
fn alignment_points(trend: TrendDirection, direction: Direction, points: [f64; 3]) -> f64 {
    match trend.alignment(direction) {
        Some(true) => points[0],
        None => points[1],
        Some(false) => points[2],
    }
}

/// 15 deep in the favourable extreme, tapering to 5 at the opposite one
fn rsi_points(rsi: f64, direction: Direction) -> f64 {
    let favour = match direction {
        Direction::Bullish => rsi,
        Direction::Bearish => 100.0 - rsi,
    };
    if favour < 30.0 {
        15.0
    } else if favour < 45.0 {
        12.0
    } else if favour < 55.0 {
        10.0
    } else if favour < 70.0 {
        7.0
    } else {
        5.0
    }
}

fn zone_points(zones: Option<&PremiumDiscountZone>, direction: Direction) -> f64 {
    match (zones.map(|z| z.current_zone), direction) {
        (Some(PriceZone::Discount), Direction::Bullish)
        | (Some(PriceZone::Premium), Direction::Bearish) => 10.0,
        _ => 3.0,
    }
}

fn structure_points(structure: &StructureBreakResult, direction: Direction) -> f64 {
    if structure.has_choch(direction) {
        10.0
    } else if structure.has_bos(direction) {
        7.0
    } else {
        3.0
    }
}
