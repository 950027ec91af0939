//! Core data model for Smart Money Concepts analysis
//!
//! Every entity here is serialised as-is into the JSON result, so field names
//! and enum spellings are part of the downstream contract.

use serde::{Deserialize, Serialize};

/// A single OHLCV candle.
///
/// A series handed to the analyser must be strictly ascending by `timestamp`
/// with no duplicates and no NaN prices. Only the length is checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in milliseconds since the epoch
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Lower edge of the candle body
    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Upper edge of the candle body
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Combined upper and lower wick length
    pub fn wick(&self) -> f64 {
        (self.high - self.low) - self.body()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================================
// Shared enums
// ============================================================================

/// Trade direction carried by every signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn signal(self) -> Signal {
        match self {
            Direction::Bullish => Signal::Buy,
            Direction::Bearish => Signal::Sell,
        }
    }
}

/// Actionable side of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    pub fn label(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
        }
    }
}

/// Overall trend verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendDirection {
    /// Compare against a block direction: Some(true) aligned, Some(false)
    /// opposed, None when the trend is neutral.
    pub fn alignment(self, direction: Direction) -> Option<bool> {
        match (self, direction) {
            (TrendDirection::Neutral, _) => None,
            (TrendDirection::Bullish, Direction::Bullish)
            | (TrendDirection::Bearish, Direction::Bearish) => Some(true),
            _ => Some(false),
        }
    }
}

// ============================================================================
// Swing points & trend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local extremum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub timestamp: i64,
    pub kind: SwingKind,
}

/// Swing highs and lows, each index-ascending
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingPoints {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStructure {
    #[serde(rename = "HH-HL")]
    HigherHighsHigherLows,
    #[serde(rename = "LH-LL")]
    LowerHighsLowerLows,
    #[serde(rename = "ranging")]
    Ranging,
    #[serde(rename = "undefined")]
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub strength: f64,
    pub structure: MarketStructure,
    pub hh_count: u32,
    pub hl_count: u32,
    pub lh_count: u32,
    pub ll_count: u32,
}

impl TrendResult {
    pub fn undefined() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: 0.0,
            structure: MarketStructure::Undefined,
            hh_count: 0,
            hl_count: 0,
            lh_count: 0,
            ll_count: 0,
        }
    }
}

// ============================================================================
// Order blocks & fair value gaps
// ============================================================================

/// Size of the move that followed an order block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    #[serde(rename = "type")]
    pub kind: Direction,
    pub signal: Signal,
    pub high: f64,
    pub low: f64,
    pub mid: f64,
    pub distance: f64,
    pub distance_pct: f64,
    pub strength: BlockStrength,
    pub volume_ratio: f64,
    pub volume_confirmed: bool,
    pub trend_aligned: bool,
    pub quality_score: f64,
    pub mitigated: bool,
    pub in_zone: bool,
    pub rank: usize,
    /// Index of the block candle
    pub index: usize,
    pub timestamp: i64,
    /// Index of the swing point the block was found from
    pub swing_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    #[serde(rename = "type")]
    pub kind: Direction,
    pub signal: Signal,
    pub high: f64,
    pub low: f64,
    pub mid: f64,
    pub gap_pct: f64,
    pub distance: f64,
    pub distance_pct: f64,
    /// Index of the third candle of the gap triple
    pub index: usize,
    pub timestamp: i64,
    pub filled: bool,
}

// ============================================================================
// Structure breaks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    #[serde(rename = "type")]
    pub kind: Direction,
    pub level: f64,
    pub broken_at: f64,
    pub signal: Signal,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Bos,
    Choch,
}

/// A structure break observed while walking the series forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub kind: BreakKind,
    pub direction: Direction,
    pub level: f64,
    pub broken_at: f64,
    pub index: usize,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureBreakResult {
    pub bos: Vec<StructureBreak>,
    pub choch: Option<StructureBreak>,
    pub history: Vec<StructureEvent>,
}

impl StructureBreakResult {
    pub fn has_choch(&self, direction: Direction) -> bool {
        self.choch.as_ref().is_some_and(|c| c.kind == direction)
    }

    pub fn has_bos(&self, direction: Direction) -> bool {
        self.bos.iter().any(|b| b.kind == direction)
    }
}

// ============================================================================
// Liquidity & premium/discount
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityZone {
    pub level: f64,
    #[serde(rename = "type")]
    pub kind: LiquidityKind,
    pub signal: Signal,
    pub distance_pct: f64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityZones {
    pub equal_highs: Vec<LiquidityZone>,
    pub equal_lows: Vec<LiquidityZone>,
    pub nearest_liquidity_above: Option<LiquidityZone>,
    pub nearest_liquidity_below: Option<LiquidityZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceZone {
    Premium,
    Discount,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub high: f64,
    pub low: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumDiscountZone {
    pub premium: Band,
    pub discount: Band,
    pub equilibrium: f64,
    pub current_zone: PriceZone,
    pub zone_signal: Signal,
    pub zone_message: String,
    pub fibonacci: Vec<FibLevel>,
    pub range_pct: f64,
}

// ============================================================================
// Indicators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RsiSignal {
    Oversold,
    Overbought,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiReading {
    pub value: f64,
    pub signal: RsiSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrReading {
    pub value: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: RsiReading,
    pub atr: AtrReading,
    pub ma20: f64,
    pub ma50: f64,
    pub ma200: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub ema200: f64,
    pub volume_ratio: f64,
    pub price_vs_ma20: Relation,
    pub price_vs_ma50: Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmaTrendLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl EmaTrendLabel {
    pub fn from_bullish_count(count: u8) -> Self {
        match count {
            5.. => EmaTrendLabel::StrongBullish,
            4 => EmaTrendLabel::Bullish,
            2 | 3 => EmaTrendLabel::Neutral,
            1 => EmaTrendLabel::Bearish,
            0 => EmaTrendLabel::StrongBearish,
        }
    }

    pub fn as_trend(self) -> TrendDirection {
        match self {
            EmaTrendLabel::StrongBullish | EmaTrendLabel::Bullish => TrendDirection::Bullish,
            EmaTrendLabel::Neutral => TrendDirection::Neutral,
            EmaTrendLabel::Bearish | EmaTrendLabel::StrongBearish => TrendDirection::Bearish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmaCross {
    GoldenCross,
    DeathCross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaTrend {
    pub trend: EmaTrendLabel,
    pub bullish_count: u8,
    pub cross: Option<EmaCross>,
    pub ema20: f64,
    pub ema50: f64,
    pub ema200: f64,
}

// ============================================================================
// Confluence, setups & alerts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfluenceStrength {
    Strong,
    Moderate,
    Weak,
    Avoid,
}

impl ConfluenceStrength {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ConfluenceStrength::Strong
        } else if score >= 60.0 {
            ConfluenceStrength::Moderate
        } else if score >= 40.0 {
            ConfluenceStrength::Weak
        } else {
            ConfluenceStrength::Avoid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceFactors {
    pub quality: f64,
    pub trend_alignment: f64,
    pub ema_alignment: f64,
    pub rsi_confirmation: f64,
    pub zone_position: f64,
    pub structure_confirmation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceResult {
    pub score: f64,
    pub strength: ConfluenceStrength,
    pub factors: ConfluenceFactors,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub direction: Direction,
    pub signal: Signal,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub take_profit_3: f64,
    pub risk: f64,
    pub risk_pct: f64,
    pub risk_reward_1: f64,
    pub risk_reward_2: f64,
    pub risk_reward_3: f64,
    pub valid: bool,
    pub order_block_rank: usize,
    pub confluence: ConfluenceResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "bullish")]
    OrderBlockBullish,
    #[serde(rename = "bearish")]
    OrderBlockBearish,
    #[serde(rename = "fvg_bullish")]
    FvgBullish,
    #[serde(rename = "fvg_bearish")]
    FvgBearish,
    #[serde(rename = "bos_bullish")]
    BosBullish,
    #[serde(rename = "bos_bearish")]
    BosBearish,
    #[serde(rename = "choch_bullish")]
    ChochBullish,
    #[serde(rename = "choch_bearish")]
    ChochBearish,
    #[serde(rename = "zone_premium")]
    ZonePremium,
    #[serde(rename = "zone_discount")]
    ZoneDiscount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub signal: Signal,
    pub priority: AlertPriority,
    pub message: String,
    pub level: f64,
    pub distance_pct: f64,
}

// ============================================================================
// Final result
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_buy: usize,
    pub total_sell: usize,
    pub total_fvg: usize,
    pub volume_confirmed: usize,
    pub trend_aligned: usize,
    pub high_quality: usize,
}

/// Everything derived from one candle series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub current_price: f64,
    /// Timestamp of the last analysed candle
    pub as_of: i64,
    pub candles_analyzed: usize,
    pub trend: TrendResult,
    pub ema_trend: EmaTrend,
    pub order_blocks: Vec<OrderBlock>,
    pub major_order_blocks: Vec<OrderBlock>,
    pub nearest_buy_zone: Option<OrderBlock>,
    pub nearest_sell_zone: Option<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub structure_breaks: StructureBreakResult,
    pub liquidity_zones: LiquidityZones,
    pub zones: Option<PremiumDiscountZone>,
    pub indicators: IndicatorSet,
    pub summary: AnalysisSummary,
    pub alerts: Vec<Alert>,
    pub alert_count: usize,
    pub trade_setups: Vec<TradeSetup>,
}

/// Percentage distance of `level` from `price`, 0 when price is 0
pub(crate) fn pct_of(distance: f64, price: f64) -> f64 {
    if price == 0.0 {
        0.0
    } else {
        distance / price * 100.0
    }
}
