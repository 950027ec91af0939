//! Watchlist scanner: bounded per-symbol fetch + analyze fan-out

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::analysis::SmcAnalyzer;
use crate::config::AnalysisConfig;
use crate::sink::AlertSink;
use crate::source::PriceDataSource;
use crate::types::*;

/// Opportunities listed per side in the summary
const TOP_OPPORTUNITIES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    pub interval: String,
    pub limit: u32,
    /// Symbols fetched and analysed at the same time
    pub max_concurrency: usize,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            interval: "1h".to_string(),
            limit: 500,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBias {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub symbol: String,
    pub message: String,
    pub priority: AlertPriority,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_symbols: usize,
    pub total_alerts: usize,
    pub market_bias: MarketBias,
    pub top_buy_opportunities: Vec<Opportunity>,
    pub top_sell_opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub interval: String,
    pub results: Vec<AnalysisResult>,
    pub skipped: Vec<SkippedSymbol>,
    pub summary: ScanSummary,
}

/// Alerts worth pushing to a notification channel
pub fn is_actionable(alert: &Alert) -> bool {
    matches!(alert.priority, AlertPriority::Critical | AlertPriority::High)
}

/// Fetch and analyse every symbol, forward critical/high alerts to the sinks
/// and summarise. Failed symbols are reported in `skipped`, never fatal.
pub async fn scan_watchlist(
    request: &ScanRequest,
    source: Arc<dyn PriceDataSource>,
    sinks: &[Arc<dyn AlertSink>],
    config: &AnalysisConfig,
) -> ScanReport {
    info!(
        symbols = request.symbols.len(),
        interval = %request.interval,
        concurrency = request.max_concurrency,
        "Starting watchlist scan"
    );

    let semaphore = Arc::new(Semaphore::new(request.max_concurrency.max(1)));
    let config = Arc::new(config.clone());
    let mut tasks = JoinSet::new();

    for (position, symbol) in request.symbols.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let source = source.clone();
        let config = config.clone();
        let interval = request.interval.clone();
        let limit = request.limit;

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => match source.fetch_candles(&symbol, &interval, limit).await {
                    Ok(candles) => {
                        SmcAnalyzer::analyze(&symbol, &candles, &config).map_err(|e| e.to_string())
                    }
                    Err(e) => Err(e.to_string()),
                },
                Err(e) => Err(e.to_string()),
            };
            (position, symbol, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(request.symbols.len());
    let mut reported = vec![false; request.symbols.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                reported[outcome.0] = true;
                outcomes.push(outcome);
            }
            Err(e) => warn!(error = %e, "Scan task failed"),
        }
    }
    // Tasks that panicked or were cancelled never hand back their symbol
    for (position, symbol) in request.symbols.iter().enumerate() {
        if !reported[position] {
            outcomes.push((position, symbol.clone(), Err("scan task failed".to_string())));
        }
    }
    outcomes.sort_by_key(|(position, _, _)| *position);

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for (_, symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(reason) => {
                warn!(symbol = %symbol, reason = %reason, "Skipping symbol");
                skipped.push(SkippedSymbol { symbol, reason });
            }
        }
    }

    for result in &results {
        let actionable: Vec<Alert> = result
            .alerts
            .iter()
            .filter(|a| is_actionable(a))
            .cloned()
            .collect();
        if actionable.is_empty() {
            continue;
        }
        for sink in sinks {
            if let Err(e) = sink.deliver(&result.symbol, &actionable).await {
                warn!(
                    sink = sink.name(),
                    symbol = %result.symbol,
                    error = %e,
                    "Alert delivery failed"
                );
            }
        }
    }

    let summary = summarize(&results);
    info!(
        analyzed = results.len(),
        skipped = skipped.len(),
        alerts = summary.total_alerts,
        "Watchlist scan complete"
    );

    ScanReport {
        generated_at: Utc::now(),
        interval: request.interval.clone(),
        results,
        skipped,
        summary,
    }
}

/// Market bias and the nearest actionable opportunities across symbols
pub fn summarize(results: &[AnalysisResult]) -> ScanSummary {
    let mut bias = MarketBias::default();
    let mut buys = Vec::new();
    let mut sells = Vec::new();

    for result in results {
        match result.trend.direction {
            TrendDirection::Bullish => bias.bullish += 1,
            TrendDirection::Bearish => bias.bearish += 1,
            TrendDirection::Neutral => bias.neutral += 1,
        }

        for alert in result.alerts.iter().filter(|a| is_actionable(a)) {
            let opportunity = Opportunity {
                symbol: result.symbol.clone(),
                message: alert.message.clone(),
                priority: alert.priority,
                distance_pct: alert.distance_pct,
            };
            match alert.signal {
                Signal::Buy => buys.push(opportunity),
                Signal::Sell => sells.push(opportunity),
            }
        }
    }

    for side in [&mut buys, &mut sells] {
        side.sort_by(|a, b| a.distance_pct.total_cmp(&b.distance_pct));
        side.truncate(TOP_OPPORTUNITIES);
    }

    ScanSummary {
        total_symbols: results.len(),
        total_alerts: results.iter().map(|r| r.alert_count).sum(),
        market_bias: bias,
        top_buy_opportunities: buys,
        top_sell_opportunities: sells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, SourceError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn make_candles(n: usize, drift: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let center = 100.0 + drift * i as f64 + 6.0 * ((i as f64) * 0.35).sin();
                Candle {
                    timestamp: i as i64 * 3_600_000,
                    open: center - 0.5,
                    high: center + 1.0,
                    low: center - 1.0,
                    close: center + 0.5,
                    volume: 100.0 + (i % 7) as f64 * 20.0,
                }
            })
            .collect()
    }

    /// Serves fixed series and tracks peak concurrency
    struct StaticSource {
        series: HashMap<String, Vec<Candle>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StaticSource {
        fn new(series: Vec<(&str, Vec<Candle>)>) -> Self {
            Self {
                series: series.into_iter().map(|(s, c)| (s.to_string(), c)).collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceDataSource for StaticSource {
        async fn fetch_candles(
            &self,
            symbol: &str,
            interval: &str,
            _limit: u32,
        ) -> Result<Vec<Candle>, SourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.series
                .get(symbol)
                .cloned()
                .ok_or_else(|| SourceError::Empty {
                    symbol: symbol.to_string(),
                    interval: interval.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, Vec<Alert>)>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, symbol: &str, alerts: &[Alert]) -> Result<(), SinkError> {
            self.delivered
                .lock()
                .await
                .push((symbol.to_string(), alerts.to_vec()));
            Ok(())
        }
    }

    fn request(symbols: &[&str], max_concurrency: usize) -> ScanRequest {
        ScanRequest {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            max_concurrency,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_scan_reports_results_and_skips() {
        let source = Arc::new(StaticSource::new(vec![
            ("BTCUSDT", make_candles(200, 0.05)),
            ("ETHUSDT", make_candles(150, -0.05)),
            ("TINYUSDT", make_candles(10, 0.0)),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let sinks: Vec<Arc<dyn AlertSink>> = vec![sink.clone()];

        let report = scan_watchlist(
            &request(&["BTCUSDT", "MISSING", "ETHUSDT", "TINYUSDT"], 2),
            source,
            &sinks,
            &AnalysisConfig::default(),
        )
        .await;

        let analysed: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(analysed, vec!["BTCUSDT", "ETHUSDT"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(skipped, vec!["MISSING", "TINYUSDT"]);
        assert!(report.skipped[1].reason.contains("insufficient data"));

        assert_eq!(report.summary.total_symbols, 2);
        let bias = &report.summary.market_bias;
        assert_eq!(bias.bullish + bias.bearish + bias.neutral, 2);

        for (_, alerts) in sink.delivered.lock().await.iter() {
            assert!(!alerts.is_empty());
            assert!(alerts.iter().all(is_actionable));
        }
    }

    /// Panics for one symbol, serves the rest
    struct PanickingSource {
        inner: StaticSource,
    }

    #[async_trait]
    impl PriceDataSource for PanickingSource {
        async fn fetch_candles(
            &self,
            symbol: &str,
            interval: &str,
            limit: u32,
        ) -> Result<Vec<Candle>, SourceError> {
            if symbol == "BROKEN" {
                panic!("feed crashed for {symbol}");
            }
            self.inner.fetch_candles(symbol, interval, limit).await
        }
    }

    #[tokio::test]
    async fn test_failed_task_is_reported_as_skipped() {
        let source = Arc::new(PanickingSource {
            inner: StaticSource::new(vec![
                ("BTCUSDT", make_candles(120, 0.05)),
                ("ETHUSDT", make_candles(120, -0.05)),
            ]),
        });

        let report = scan_watchlist(
            &request(&["BTCUSDT", "BROKEN", "ETHUSDT"], 3),
            source,
            &[],
            &AnalysisConfig::default(),
        )
        .await;

        let analysed: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(analysed, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(
            report.skipped,
            vec![SkippedSymbol {
                symbol: "BROKEN".to_string(),
                reason: "scan task failed".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_scan_respects_concurrency_limit() {
        let symbols = ["A", "B", "C", "D", "E", "F"];
        let source = Arc::new(StaticSource::new(
            symbols.iter().map(|s| (*s, make_candles(60, 0.0))).collect(),
        ));

        let report = scan_watchlist(
            &request(&symbols, 2),
            source.clone(),
            &[],
            &AnalysisConfig::default(),
        )
        .await;

        assert_eq!(report.results.len(), 6);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_summary_opportunities_sorted_and_capped() {
        let base = {
            let candles = make_candles(100, 0.0);
            SmcAnalyzer::analyze("X", &candles, &AnalysisConfig::default()).unwrap()
        };
        let alert = |signal: Signal, priority: AlertPriority, distance_pct: f64| Alert {
            kind: AlertKind::OrderBlockBullish,
            signal,
            priority,
            message: format!("{distance_pct}"),
            level: 100.0,
            distance_pct,
        };

        let mut result = base.clone();
        result.alerts = (0..7)
            .map(|i| alert(Signal::Buy, AlertPriority::High, 7.0 - i as f64))
            .chain([
                alert(Signal::Buy, AlertPriority::Medium, 0.1),
                alert(Signal::Sell, AlertPriority::Critical, 0.5),
            ])
            .collect();
        result.alert_count = result.alerts.len();

        let summary = summarize(&[result]);
        assert_eq!(summary.total_alerts, 9);
        assert_eq!(summary.top_buy_opportunities.len(), 5);
        assert_eq!(summary.top_buy_opportunities[0].distance_pct, 1.0);
        assert!(summary
            .top_buy_opportunities
            .iter()
            .all(|o| o.priority == AlertPriority::High));
        assert_eq!(summary.top_sell_opportunities.len(), 1);
    }
}
