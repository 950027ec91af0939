//! SMC Scan: Smart Money Concepts scanner and analysis server
//!
//! Usage:
//!   smc-scan serve --port 3002                   Launch the analysis API
//!   smc-scan scan --symbols BTCUSDT,ETHUSDT      Scan a watchlist from CLI
//!   smc-scan analyze --file candles.json         Analyse a local candle file
//!   smc-scan history --symbol BTCUSDT            List stored snapshots

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use persistence::{Database, NewSnapshot};
use serde::Deserialize;
use smc_engine::{
    scan_watchlist, AlertSink, AnalysisConfig, AnalysisResult, BinanceClient, CachedSource,
    CandleCache, Candle, LogAlertSink, PriceDataSource, RetryPolicy, ScanReport, ScanRequest,
    SmcAnalyzer, TrendDirection, WebhookAlertSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_DB_PATH: &str = "data/smc.db";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const WEBHOOK_MAX_PER_MINUTE: usize = 20;

#[derive(Parser)]
#[command(name = "smc-scan")]
#[command(about = "Smart Money Concepts market structure scanner", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file overriding the analysis configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the analysis web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 3002)]
        port: u16,
    },
    /// Fetch, analyse and alert on a watchlist
    Scan {
        /// Symbols to scan (comma-separated)
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
        /// Candle interval
        #[arg(long, default_value = "1h")]
        interval: String,
        /// Candles fetched per symbol
        #[arg(long, default_value_t = 500)]
        limit: u32,
        /// Symbols processed at the same time
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        /// Write the full scan report to this JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Analyse candles from a JSON file (array of candles)
    Analyze {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "LOCAL")]
        symbol: String,
    },
    /// Show stored snapshots for a symbol
    History {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[derive(Clone)]
struct AppState {
    source: Arc<dyn PriceDataSource>,
    db: Arc<Database>,
    config: Arc<AnalysisConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(&host, port, config).await,
        Commands::Scan {
            symbols,
            interval,
            limit,
            concurrency,
            export,
        } => {
            let request = ScanRequest {
                symbols: if symbols.is_empty() {
                    default_watchlist()
                } else {
                    symbols
                },
                interval,
                limit,
                max_concurrency: concurrency,
            };
            cmd_scan(request, export, config).await
        }
        Commands::Analyze { file, symbol } => cmd_analyze(&file, &symbol, &config),
        Commands::History { symbol, limit } => cmd_history(&symbol, limit).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,smc_engine=debug,smc_scan=debug")
    } else {
        EnvFilter::new("info,smc_engine=info,smc_scan=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;
    let config: AnalysisConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    info!(path = %path.display(), "Loaded analysis config");
    Ok(config)
}

fn default_watchlist() -> Vec<String> {
    ["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn db_path() -> String {
    std::env::var("SMC_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}

async fn open_db() -> anyhow::Result<Database> {
    let path = db_path();
    let db = Database::new(&path).await.map_err(|e| {
        error!("Failed to initialize database: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;
    info!("Database initialized: {}", path);
    Ok(db)
}

/// Binance behind the TTL cache and retry policy
fn build_source(config: &AnalysisConfig) -> anyhow::Result<Arc<dyn PriceDataSource>> {
    let ttl = std::env::var("SMC_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_CACHE_TTL_SECS);
    let cache = Arc::new(CandleCache::new(
        Duration::from_secs(ttl),
        config.min_candles,
    ));
    let source: Arc<dyn PriceDataSource> = Arc::new(CachedSource::new(
        BinanceClient::new()?,
        cache,
        RetryPolicy::default(),
    ));
    Ok(source)
}

fn build_sinks() -> anyhow::Result<Vec<Arc<dyn AlertSink>>> {
    let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();
    sinks.push(Arc::new(LogAlertSink));
    if let Ok(url) = std::env::var("SMC_WEBHOOK_URL") {
        if !url.is_empty() {
            sinks.push(Arc::new(WebhookAlertSink::new(url, WEBHOOK_MAX_PER_MINUTE)?));
            info!("Webhook alert delivery enabled");
        }
    }
    Ok(sinks)
}

fn trend_label(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Bullish => "bullish",
        TrendDirection::Bearish => "bearish",
        TrendDirection::Neutral => "neutral",
    }
}

/// Persist one analysis result. Returns false when an identical snapshot exists.
async fn store_snapshot(
    db: &Database,
    interval: &str,
    result: &AnalysisResult,
) -> anyhow::Result<bool> {
    let json = serde_json::to_string(result)?;
    let snapshot = NewSnapshot {
        symbol: &result.symbol,
        interval,
        as_of: result.as_of,
        current_price: result.current_price,
        trend: trend_label(result.trend.direction),
        alert_count: result.alert_count as i64,
        result_json: &json,
    };
    Ok(db.snapshots().save(&snapshot).await?)
}

// ============================================================================
// CLI commands
// ============================================================================

async fn cmd_scan(
    request: ScanRequest,
    export: Option<PathBuf>,
    config: AnalysisConfig,
) -> anyhow::Result<()> {
    println!("\n=== SMC Scan v{} ===", APP_VERSION);
    println!(
        "Symbols: {} | Interval: {} | Limit: {} | Concurrency: {}",
        request.symbols.join(", "),
        request.interval,
        request.limit,
        request.max_concurrency
    );
    println!();

    let db = open_db().await?;
    let source = build_source(&config)?;
    let sinks = build_sinks()?;

    let report = scan_watchlist(&request, source, &sinks, &config).await;

    let mut stored = 0;
    for result in &report.results {
        match store_snapshot(&db, &report.interval, result).await {
            Ok(true) => stored += 1,
            Ok(false) => {}
            Err(e) => warn!(symbol = %result.symbol, error = %e, "Failed to store snapshot"),
        }
    }

    print_report(&report);
    println!("\nSnapshots stored: {}", stored);

    if let Some(path) = export {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Report exported to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    println!(
        "{:<12} {:>14} {:>9} {:>7} {:>7}",
        "SYMBOL", "PRICE", "TREND", "ALERTS", "SETUPS"
    );
    for result in &report.results {
        println!(
            "{:<12} {:>14.4} {:>9} {:>7} {:>7}",
            result.symbol,
            result.current_price,
            trend_label(result.trend.direction),
            result.alert_count,
            result.trade_setups.len()
        );
    }

    for skipped in &report.skipped {
        println!("SKIPPED {}: {}", skipped.symbol, skipped.reason);
    }

    let summary = &report.summary;
    println!(
        "\nBias: {} bullish / {} bearish / {} neutral | {} alerts total",
        summary.market_bias.bullish,
        summary.market_bias.bearish,
        summary.market_bias.neutral,
        summary.total_alerts
    );
    for (title, list) in [
        ("Top buy opportunities", &summary.top_buy_opportunities),
        ("Top sell opportunities", &summary.top_sell_opportunities),
    ] {
        if list.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for opp in list {
            println!(
                "  {:<10} {:>6.2}%  {}",
                opp.symbol, opp.distance_pct, opp.message
            );
        }
    }
}

fn cmd_analyze(
    file: &std::path::Path,
    symbol: &str,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", file.display(), e))?;
    let candles: Vec<Candle> = serde_json::from_str(&raw)?;
    info!(symbol, candles = candles.len(), "Analysing candle file");

    let result = SmcAnalyzer::analyze(symbol, &candles, config)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_history(symbol: &str, limit: i64) -> anyhow::Result<()> {
    let db = open_db().await?;
    let records = db.snapshots().history(symbol, limit).await?;

    if records.is_empty() {
        println!("No snapshots stored for {}", symbol);
        return Ok(());
    }

    println!(
        "{:<16} {:<6} {:>14} {:>9} {:>7}",
        "AS OF", "TF", "PRICE", "TREND", "ALERTS"
    );
    for record in records {
        let as_of = chrono::DateTime::from_timestamp_millis(record.as_of)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| record.as_of.to_string());
        println!(
            "{:<16} {:<6} {:>14.4} {:>9} {:>7}",
            as_of, record.interval, record.current_price, record.trend, record.alert_count
        );
    }
    Ok(())
}

// ============================================================================
// HTTP server
// ============================================================================

async fn cmd_serve(host: &str, port: u16, config: AnalysisConfig) -> anyhow::Result<()> {
    info!("SMC Scan v{} starting...", APP_VERSION);

    let state = AppState {
        source: build_source(&config)?,
        db: Arc::new(open_db().await?),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api_health))
        .route("/analyze", get(api_analyze_symbol).post(api_analyze_candles))
        .route("/snapshots/:symbol", get(api_snapshots))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(cors);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== SMC Scan v{} ===", APP_VERSION);
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /api/health              - Health check");
    println!("  GET  /api/analyze             - Fetch and analyse ?symbol=&interval=&limit=");
    println!("  POST /api/analyze             - Analyse candles from the request body");
    println!("  GET  /api/snapshots/:symbol   - Stored snapshots, newest first");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message.to_string(),
        })),
    )
}

/// GET /api/health
async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "smc-scan",
        "version": APP_VERSION,
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeQuery {
    symbol: String,
    #[serde(default = "default_interval")]
    interval: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_limit() -> u32 {
    500
}

/// GET /api/analyze: fetch candles, analyse and store a snapshot
async fn api_analyze_symbol(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let symbol = query.symbol.to_uppercase();
    let candles = state
        .source
        .fetch_candles(&symbol, &query.interval, query.limit)
        .await
        .map_err(|e| {
            warn!(symbol = %symbol, error = %e, "Candle fetch failed");
            api_error(StatusCode::BAD_GATEWAY, e)
        })?;

    let result = SmcAnalyzer::analyze(&symbol, &candles, &state.config)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    if let Err(e) = store_snapshot(&state.db, &query.interval, &result).await {
        warn!(symbol = %symbol, error = %e, "Failed to store snapshot");
    }

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    symbol: String,
    candles: Vec<Candle>,
}

/// POST /api/analyze: analyse caller-supplied candles (nothing stored)
async fn api_analyze_candles(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalysisResult>, ApiError> {
    SmcAnalyzer::analyze(&body.symbol, &body.candles, &state.config)
        .map(Json)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))
}

#[derive(Debug, Deserialize)]
struct SnapshotQuery {
    #[serde(default = "default_snapshot_limit")]
    limit: i64,
}

fn default_snapshot_limit() -> i64 {
    20
}

/// GET /api/snapshots/:symbol
async fn api_snapshots(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = symbol.to_uppercase();
    let records = state
        .db
        .snapshots()
        .history(&symbol, query.limit)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "symbol": symbol,
        "count": records.len(),
        "snapshots": records,
    })))
}
