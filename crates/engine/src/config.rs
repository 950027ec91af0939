//! Tunables for one analysis run

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Window lengths, tolerances and caps used by every detector.
///
/// Deserialises from a partial JSON object; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum series length accepted by the analyser
    pub min_candles: usize,
    /// Fractal window for regular swing points
    pub swing_length: usize,
    /// Fractal window for major swing points
    pub major_swing_length: usize,
    /// Candles scanned backward from a swing point for an order block
    pub ob_lookback: usize,
    pub max_order_blocks: usize,
    pub max_major_order_blocks: usize,
    /// Midpoint proximity (% of price) under which blocks are merged
    pub ob_overlap_pct: f64,
    pub fvg_min_gap_pct: f64,
    pub max_fair_value_gaps: usize,
    /// Relative tolerance for equal highs/lows (0.005 = 0.5%)
    pub liquidity_tolerance: f64,
    pub max_liquidity_per_side: usize,
    /// Swings per side used for the premium/discount range
    pub zone_swing_count: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub volume_period: usize,
    /// Bars in which an EMA50/EMA200 crossing still counts as fresh
    pub cross_lookback: usize,
    pub atr_stop_multiplier: f64,
    pub max_risk_pct: f64,
    pub trade_setup_count: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_candles: 20,
            swing_length: 5,
            major_swing_length: 10,
            ob_lookback: 10,
            max_order_blocks: 10,
            max_major_order_blocks: 5,
            ob_overlap_pct: 3.0,
            fvg_min_gap_pct: 0.1,
            max_fair_value_gaps: 10,
            liquidity_tolerance: 0.005,
            max_liquidity_per_side: 5,
            zone_swing_count: 5,
            rsi_period: 14,
            atr_period: 14,
            volume_period: 20,
            cross_lookback: 5,
            atr_stop_multiplier: 0.5,
            max_risk_pct: 5.0,
            trade_setup_count: 3,
        }
    }
}

impl AnalysisConfig {
    /// Reject settings the detectors cannot run with
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let windows = [
            ("swing_length", self.swing_length),
            ("major_swing_length", self.major_swing_length),
            ("ob_lookback", self.ob_lookback),
            ("zone_swing_count", self.zone_swing_count),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
            ("volume_period", self.volume_period),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, v)| *v == 0) {
            return Err(AnalysisError::InvalidConfig(format!("{name} must be > 0")));
        }
        if self.min_candles < 3 {
            return Err(AnalysisError::InvalidConfig(
                "min_candles must be at least 3".to_string(),
            ));
        }
        let ratios = [
            ("ob_overlap_pct", self.ob_overlap_pct),
            ("fvg_min_gap_pct", self.fvg_min_gap_pct),
            ("liquidity_tolerance", self.liquidity_tolerance),
            ("atr_stop_multiplier", self.atr_stop_multiplier),
            ("max_risk_pct", self.max_risk_pct),
        ];
        if let Some((name, _)) = ratios.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "{name} must be a non-negative number"
            )));
        }
        Ok(())
    }
}
