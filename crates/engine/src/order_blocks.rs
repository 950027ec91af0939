//! Order block detection
//!
//! A bearish block is the last bullish candle before a swing high, a bullish
//! block the last bearish candle before a swing low. The zone is the candle
//! body. Blocks are dropped once a later close trades through the far edge,
//! merged when they overlap, scored and ranked by distance to price.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::indicators::IndicatorSnapshot;
use crate::types::*;

/// Wick-to-body ratio above which a candle is too noisy to mark a zone
const MAX_WICK_TO_BODY: f64 = 2.0;
/// Volume ratio above which a block counts as volume-confirmed
const VOLUME_CONFIRMED_RATIO: f64 = 1.5;

// ============================================================================
// Scoring
// ============================================================================

/// Volume component of the quality score (max 40)
pub fn volume_factor(ratio: f64) -> f64 {
    if ratio > 2.0 {
        40.0
    } else if ratio > 1.5 {
        30.0
    } else if ratio > 1.2 {
        20.0
    } else if ratio > 0.8 {
        10.0
    } else {
        0.0
    }
}

/// Strength label and score component (max 30) for the move that followed a block
pub fn strength_for_move(move_pct: f64) -> (BlockStrength, f64) {
    if move_pct > 5.0 {
        (BlockStrength::Strong, 30.0)
    } else if move_pct > 2.0 {
        (BlockStrength::Moderate, 20.0)
    } else {
        (BlockStrength::Weak, 10.0)
    }
}

/// Trend component of the quality score (max 30)
fn trend_factor(aligned: bool) -> f64 {
    if aligned {
        30.0
    } else {
        10.0
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Closes strictly after each index: (max, min). The last entry holds the
/// neutral values so nothing after the final candle mitigates a block.
fn later_close_extrema(candles: &[Candle]) -> Vec<(f64, f64)> {
    let mut extrema = vec![(f64::NEG_INFINITY, f64::INFINITY); candles.len()];
    for j in (0..candles.len().saturating_sub(1)).rev() {
        let (next_max, next_min) = extrema[j + 1];
        let close = candles[j + 1].close;
        extrema[j] = (next_max.max(close), next_min.min(close));
    }
    extrema
}

fn overlaps(a: &OrderBlock, b: &OrderBlock, price: f64, overlap_pct: f64) -> bool {
    let intersects = a.low <= b.high && b.low <= a.high;
    intersects || pct_of((a.mid - b.mid).abs(), price) <= overlap_pct
}

pub struct OrderBlockDetector<'a> {
    candles: &'a [Candle],
    indicators: &'a IndicatorSnapshot,
    config: &'a AnalysisConfig,
    later: Vec<(f64, f64)>,
    price: f64,
}

impl<'a> OrderBlockDetector<'a> {
    pub fn new(
        candles: &'a [Candle],
        indicators: &'a IndicatorSnapshot,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            candles,
            indicators,
            config,
            later: later_close_extrema(candles),
            price: candles.last().map(|c| c.close).unwrap_or(0.0),
        }
    }

    /// Unmitigated, merged and ranked blocks for the given swings
    pub fn detect(&self, swings: &SwingPoints, max_blocks: usize) -> Vec<OrderBlock> {
        let bearish: Vec<OrderBlock> = swings
            .highs
            .iter()
            .filter_map(|s| self.block_from_swing(s, Direction::Bearish))
            .collect();
        let bullish: Vec<OrderBlock> = swings
            .lows
            .iter()
            .filter_map(|s| self.block_from_swing(s, Direction::Bullish))
            .collect();

        debug!(
            bearish = bearish.len(),
            bullish = bullish.len(),
            "Order block candidates"
        );

        let mut blocks = self.merge_overlapping(bearish);
        blocks.extend(self.merge_overlapping(bullish));

        blocks.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        blocks.truncate(max_blocks);
        for (i, block) in blocks.iter_mut().enumerate() {
            block.rank = i + 1;
            block.in_zone = block.low <= self.price && self.price <= block.high;
        }
        blocks
    }

    /// Scan back from a swing for the nearest opposite-colored candle
    fn block_from_swing(&self, swing: &SwingPoint, direction: Direction) -> Option<OrderBlock> {
        let start = swing.index.saturating_sub(self.config.ob_lookback);
        let index = (start..swing.index).rev().find(|&j| {
            let c = &self.candles[j];
            match direction {
                Direction::Bearish => c.is_bullish(),
                Direction::Bullish => c.is_bearish(),
            }
        })?;

        let candle = &self.candles[index];
        if candle.wick() > MAX_WICK_TO_BODY * candle.body() {
            return None;
        }

        let (high, low) = (candle.body_high(), candle.body_low());
        let (later_max, later_min) = self.later[index];
        let mitigated = match direction {
            Direction::Bearish => later_max > high,
            Direction::Bullish => later_min < low,
        };
        if mitigated {
            return None;
        }

        let origin = candle.close;
        let move_pct = pct_of((self.candles[swing.index].close - origin).abs(), origin);
        let (strength, strength_points) = strength_for_move(move_pct);

        let volume_ratio = self
            .indicators
            .volume_ratios
            .get(index)
            .copied()
            .unwrap_or(1.0);
        let trend_aligned = self.indicators.macro_trend == direction;
        let quality_score =
            volume_factor(volume_ratio) + trend_factor(trend_aligned) + strength_points;

        let mid = (high + low) / 2.0;
        let distance = (self.price - mid).abs();

        Some(OrderBlock {
            kind: direction,
            signal: direction.signal(),
            high,
            low,
            mid,
            distance,
            distance_pct: pct_of(distance, self.price),
            strength,
            volume_ratio,
            volume_confirmed: volume_ratio > VOLUME_CONFIRMED_RATIO,
            trend_aligned,
            quality_score,
            mitigated: false,
            in_zone: false,
            rank: 0,
            index,
            timestamp: candle.timestamp,
            swing_index: swing.index,
        })
    }

    /// Collapse overlapping blocks of one direction, keeping the strongest
    /// (then nearest) representative of each cluster
    fn merge_overlapping(&self, mut candidates: Vec<OrderBlock>) -> Vec<OrderBlock> {
        candidates.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then(a.distance.total_cmp(&b.distance))
        });

        let mut kept: Vec<OrderBlock> = Vec::new();
        for block in candidates {
            if !kept
                .iter()
                .any(|k| overlaps(k, &block, self.price, self.config.ob_overlap_pct))
            {
                kept.push(block);
            }
        }
        kept
    }
}
