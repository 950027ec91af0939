//! SMC Engine: Smart Money Concepts analysis of OHLCV candle series
//!
//! Pure detection core plus the thin collaborators around it.
//! Provides:
//! - Swing points, trend, order blocks, fair value gaps, BOS/CHoCH,
//!   liquidity pools and premium/discount zones
//! - Confluence scoring, trade setups and prioritised alerts
//! - Candle sources with TTL cache and retry policy (Binance public API)
//! - Alert sinks and a bounded-concurrency watchlist scanner

pub mod alerts;
pub mod analysis;
pub mod api;
pub mod config;
pub mod confluence;
pub mod error;
pub mod fvg;
pub mod indicators;
pub mod liquidity;
pub mod order_blocks;
pub mod scanner;
pub mod setups;
pub mod sink;
pub mod source;
pub mod structure;
pub mod swings;
pub mod types;
pub mod zones;

// Re-exports for convenience
pub use alerts::AlertGenerator;
pub use analysis::SmcAnalyzer;
pub use api::BinanceClient;
pub use config::AnalysisConfig;
pub use confluence::{ConfluenceContext, ConfluenceScorer};
pub use error::{AnalysisError, SinkError, SourceError};
pub use fvg::FairValueGapDetector;
pub use indicators::{IndicatorEngine, IndicatorSnapshot};
pub use liquidity::LiquidityZoneDetector;
pub use order_blocks::OrderBlockDetector;
pub use scanner::{scan_watchlist, ScanReport, ScanRequest, ScanSummary, SkippedSymbol};
pub use setups::TradeSetupBuilder;
pub use sink::{AlertSink, LogAlertSink, WebhookAlertSink};
pub use source::{CachedSource, CandleCache, PriceDataSource, RetryPolicy};
pub use structure::StructureBreakDetector;
pub use swings::{SwingPointDetector, TrendClassifier};
pub use types::*;
pub use zones::ZoneCalculator;
