//! Full Smart Money Concepts pass over one candle series

use tracing::{debug, info};

use crate::alerts::AlertGenerator;
use crate::config::AnalysisConfig;
use crate::confluence::ConfluenceContext;
use crate::error::AnalysisError;
use crate::fvg::FairValueGapDetector;
use crate::indicators::IndicatorEngine;
use crate::liquidity::LiquidityZoneDetector;
use crate::order_blocks::OrderBlockDetector;
use crate::setups::TradeSetupBuilder;
use crate::structure::StructureBreakDetector;
use crate::swings::{SwingPointDetector, TrendClassifier};
use crate::types::*;
use crate::zones::ZoneCalculator;

/// Quality score from which a block counts as high quality
const HIGH_QUALITY_SCORE: f64 = 70.0;

/// Runs every detector in dependency order. Pure: no I/O, no state kept
/// between calls.
pub struct SmcAnalyzer;

impl SmcAnalyzer {
    pub fn analyze(
        symbol: &str,
        candles: &[Candle],
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        config.validate()?;
        let insufficient = AnalysisError::InsufficientData {
            required: config.min_candles,
            actual: candles.len(),
        };
        if candles.len() < config.min_candles {
            return Err(insufficient);
        }
        let Some(last) = candles.last() else {
            return Err(insufficient);
        };
        let price = last.close;

        info!(symbol, candles = candles.len(), price, "Running SMC analysis");

        let swings = SwingPointDetector::detect(candles, config.swing_length);
        let major_swings = SwingPointDetector::detect(candles, config.major_swing_length);
        let trend = TrendClassifier::classify(&swings);
        debug!(
            highs = swings.highs.len(),
            lows = swings.lows.len(),
            major_highs = major_swings.highs.len(),
            major_lows = major_swings.lows.len(),
            trend = ?trend.direction,
            "Swing points"
        );

        let indicators = IndicatorEngine::compute(candles, config)?;

        let detector = OrderBlockDetector::new(candles, &indicators, config);
        let order_blocks = detector.detect(&swings, config.max_order_blocks);
        let major_order_blocks = detector.detect(&major_swings, config.max_major_order_blocks);

        let fair_value_gaps = FairValueGapDetector::detect(
            candles,
            config.fvg_min_gap_pct,
            config.max_fair_value_gaps,
        );
        let structure_breaks =
            StructureBreakDetector::detect(candles, &swings, config.swing_length);
        let liquidity_zones = LiquidityZoneDetector::detect(
            &swings,
            price,
            config.liquidity_tolerance,
            config.max_liquidity_per_side,
        );
        let zones = ZoneCalculator::calculate(&swings, price, config.zone_swing_count);
        debug!(
            order_blocks = order_blocks.len(),
            major_order_blocks = major_order_blocks.len(),
            fvgs = fair_value_gaps.len(),
            bos = structure_breaks.bos.len(),
            structure_events = structure_breaks.history.len(),
            "Zones detected"
        );

        let alerts = AlertGenerator::generate(
            &order_blocks,
            &fair_value_gaps,
            &structure_breaks,
            zones.as_ref(),
        );

        let ctx = ConfluenceContext {
            trend: &trend,
            ema_trend: &indicators.ema_trend,
            rsi: indicators.set.rsi.value,
            zones: zones.as_ref(),
            structure: &structure_breaks,
        };
        let trade_setups =
            TradeSetupBuilder::build_all(&order_blocks, &ctx, indicators.set.atr.value, config);

        let summary = summarize(&order_blocks, &fair_value_gaps);
        let nearest = |signal: Signal| order_blocks.iter().find(|b| b.signal == signal).cloned();

        info!(
            symbol,
            trend = ?trend.direction,
            order_blocks = order_blocks.len(),
            alerts = alerts.len(),
            setups = trade_setups.len(),
            "Analysis complete"
        );

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            current_price: price,
            as_of: last.timestamp,
            candles_analyzed: candles.len(),
            trend,
            ema_trend: indicators.ema_trend.clone(),
            nearest_buy_zone: nearest(Signal::Buy),
            nearest_sell_zone: nearest(Signal::Sell),
            order_blocks,
            major_order_blocks,
            fair_value_gaps,
            structure_breaks,
            liquidity_zones,
            zones,
            indicators: indicators.set,
            summary,
            alert_count: alerts.len(),
            alerts,
            trade_setups,
        })
    }
}

fn summarize(order_blocks: &[OrderBlock], fair_value_gaps: &[FairValueGap]) -> AnalysisSummary {
    let count = |f: fn(&OrderBlock) -> bool| order_blocks.iter().filter(|b| f(b)).count();
    AnalysisSummary {
        total_buy: count(|b| b.signal == Signal::Buy),
        total_sell: count(|b| b.signal == Signal::Sell),
        total_fvg: fair_value_gaps.len(),
        volume_confirmed: count(|b| b.volume_confirmed),
        trend_aligned: count(|b| b.trend_aligned),
        high_quality: count(|b| b.quality_score >= HIGH_QUALITY_SCORE),
    }
}
