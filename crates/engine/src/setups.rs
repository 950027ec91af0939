//! Entry, stop and target levels for order block trades

use crate::config::AnalysisConfig;
use crate::confluence::{ConfluenceContext, ConfluenceScorer};
use crate::types::*;

pub struct TradeSetupBuilder;

impl TradeSetupBuilder {
    /// Setups for the best-ranked blocks, highest confluence first
    pub fn build_all(
        blocks: &[OrderBlock],
        ctx: &ConfluenceContext<'_>,
        atr: f64,
        config: &AnalysisConfig,
    ) -> Vec<TradeSetup> {
        let mut ranked: Vec<&OrderBlock> = blocks.iter().collect();
        ranked.sort_by_key(|b| b.rank);

        let mut setups: Vec<TradeSetup> = ranked
            .into_iter()
            .take(config.trade_setup_count)
            .map(|block| {
                let confluence = ConfluenceScorer::score(block, ctx);
                Self::build(block, ctx.zones, atr, confluence, config)
            })
            .collect();

        setups.sort_by(|a, b| b.confluence.score.total_cmp(&a.confluence.score));
        setups
    }

    pub fn build(
        block: &OrderBlock,
        zones: Option<&PremiumDiscountZone>,
        atr: f64,
        confluence: ConfluenceResult,
        config: &AnalysisConfig,
    ) -> TradeSetup {
        let buffer = config.atr_stop_multiplier * atr;
        let equilibrium = zones.map(|z| z.equilibrium);

        let (entry, stop_loss, side) = match block.kind {
            Direction::Bullish => (block.high, block.low - buffer, 1.0),
            Direction::Bearish => (block.low, block.high + buffer, -1.0),
        };
        let risk = (entry - stop_loss).abs();
        let target = |k: f64| entry + side * k * risk;

        // The range midpoint is a nearer first target when it lies ahead of entry
        let take_profit_1 = match equilibrium {
            Some(eq) if (eq - entry) * side > 0.0 => eq,
            _ => target(1.0),
        };
        let take_profit_2 = target(2.0);
        let take_profit_3 = target(3.0);

        let reward = |tp: f64| if risk > 0.0 { (tp - entry).abs() / risk } else { 0.0 };
        let risk_pct = pct_of(risk, entry);

        TradeSetup {
            direction: block.kind,
            signal: block.signal,
            entry,
            stop_loss,
            take_profit_1,
            take_profit_2,
            take_profit_3,
            risk,
            risk_pct,
            risk_reward_1: reward(take_profit_1),
            risk_reward_2: reward(take_profit_2),
            risk_reward_3: reward(take_profit_3),
            valid: risk_pct <= config.max_risk_pct,
            order_block_rank: block.rank,
            confluence,
        }
    }
}
