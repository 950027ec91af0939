//! Technical indicators used by the SMC detectors
//!
//! RSI is a plain rolling mean of gains and losses (no Wilder smoothing) and
//! the EMAs are seeded with the first close instead of an SMA warm-up. Both
//! are kept that way so results match previously published analyses.

use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage, TrueRange};
use ta::Next;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::*;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;

// ============================================================================
// Building blocks
// ============================================================================

fn sma_indicator(period: usize) -> Result<SimpleMovingAverage, AnalysisError> {
    SimpleMovingAverage::new(period)
        .map_err(|_| AnalysisError::InvalidConfig(format!("invalid SMA period {period}")))
}

fn ema_indicator(period: usize) -> Result<ExponentialMovingAverage, AnalysisError> {
    ExponentialMovingAverage::new(period)
        .map_err(|_| AnalysisError::InvalidConfig(format!("invalid EMA period {period}")))
}

/// Simple-average RSI over the last `period` price changes.
///
/// Returns 50 when there are fewer than `period + 1` closes and 100 when the
/// window holds no losses.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let recent = &closes[closes.len() - period - 1..];
    let (gains, losses) = recent
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Mean true range of the last `period` bars; 0 for short series
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period + 1 {
        return 0.0;
    }

    let mut tr = TrueRange::new();
    // The first bar has no previous close, so its range is skipped
    let ranges: Vec<f64> = candles.iter().map(|c| tr.next(c)).skip(1).collect();
    let recent = &ranges[ranges.len() - period..];
    recent.iter().sum::<f64>() / period as f64
}

/// Mean of the last `period` closes, or the last close when the series is shorter
pub fn sma(closes: &[f64], period: usize) -> f64 {
    match closes.last() {
        None => 0.0,
        Some(&last) if period == 0 || closes.len() < period => last,
        Some(_) => closes[closes.len() - period..].iter().sum::<f64>() / period as f64,
    }
}

/// EMA value after every close, seeded by the first close
pub fn ema_series(closes: &[f64], period: usize) -> Result<Vec<f64>, AnalysisError> {
    let mut ema = ema_indicator(period)?;
    Ok(closes.iter().map(|&c| ema.next(c)).collect())
}

/// Volume divided by its rolling `period` average, per candle.
///
/// The average includes the current candle; a zero average yields 1.0.
pub fn volume_ratios(candles: &[Candle], period: usize) -> Result<Vec<f64>, AnalysisError> {
    let mut avg = sma_indicator(period)?;
    Ok(candles
        .iter()
        .map(|c| {
            let mean = avg.next(c.volume);
            if mean > 0.0 {
                c.volume / mean
            } else {
                1.0
            }
        })
        .collect())
}

fn relation(price: f64, level: f64) -> Relation {
    if price > level {
        Relation::Above
    } else {
        Relation::Below
    }
}

/// Detect a fresh EMA50/EMA200 crossing confirmed by EMA20's side
fn detect_cross(ema20: &[f64], ema50: &[f64], ema200: &[f64], lookback: usize) -> Option<EmaCross> {
    let last = ema50.len().checked_sub(1)?;
    let spread = |i: usize| ema50[i] - ema200[i];
    let now = spread(last);
    let start = last.saturating_sub(lookback);
    let window = start..last;

    if now > 0.0 && ema20[last] > ema50[last] && window.clone().any(|i| spread(i) <= 0.0) {
        Some(EmaCross::GoldenCross)
    } else if now < 0.0 && ema20[last] < ema50[last] && window.into_iter().any(|i| spread(i) >= 0.0)
    {
        Some(EmaCross::DeathCross)
    } else {
        None
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Indicator outputs shared by the downstream detectors
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub set: IndicatorSet,
    pub ema_trend: EmaTrend,
    /// Per-candle volume ratio, aligned with the input series
    pub volume_ratios: Vec<f64>,
    /// Price against EMA50, used for order block trend alignment
    pub macro_trend: Direction,
}

pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Compute every indicator for the series
    pub fn compute(
        candles: &[Candle],
        config: &AnalysisConfig,
    ) -> Result<IndicatorSnapshot, AnalysisError> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let price = closes.last().copied().unwrap_or(0.0);

        let rsi_value = rsi(&closes, config.rsi_period);
        let rsi_signal = if rsi_value < RSI_OVERSOLD {
            RsiSignal::Oversold
        } else if rsi_value > RSI_OVERBOUGHT {
            RsiSignal::Overbought
        } else {
            RsiSignal::Neutral
        };

        let atr_value = atr(candles, config.atr_period);
        let atr_pct = if atr_value > 0.0 {
            pct_of(atr_value, price)
        } else {
            0.0
        };

        let ema20 = ema_series(&closes, 20)?;
        let ema50 = ema_series(&closes, 50)?;
        let ema200 = ema_series(&closes, 200)?;
        let last = |series: &[f64]| series.last().copied().unwrap_or(price);
        let (e20, e50, e200) = (last(&ema20), last(&ema50), last(&ema200));

        let bullish_count = [
            price > e20,
            price > e50,
            price > e200,
            e20 > e50,
            e50 > e200,
        ]
        .iter()
        .filter(|&&b| b)
        .count() as u8;

        let ema_trend = EmaTrend {
            trend: EmaTrendLabel::from_bullish_count(bullish_count),
            bullish_count,
            cross: detect_cross(&ema20, &ema50, &ema200, config.cross_lookback),
            ema20: e20,
            ema50: e50,
            ema200: e200,
        };

        let volume_ratios = volume_ratios(candles, config.volume_period)?;
        let ma20 = sma(&closes, 20);
        let ma50 = sma(&closes, 50);

        let set = IndicatorSet {
            rsi: RsiReading {
                value: rsi_value,
                signal: rsi_signal,
            },
            atr: AtrReading {
                value: atr_value,
                pct: atr_pct,
            },
            ma20,
            ma50,
            ma200: sma(&closes, 200),
            ema20: e20,
            ema50: e50,
            ema200: e200,
            volume_ratio: volume_ratios.last().copied().unwrap_or(1.0),
            price_vs_ma20: relation(price, ma20),
            price_vs_ma50: relation(price, ma50),
        };

        let macro_trend = if price > e50 {
            Direction::Bullish
        } else {
            Direction::Bearish
        };

        Ok(IndicatorSnapshot {
            set,
            ema_trend,
            volume_ratios,
            macro_trend,
        })
    }
}
