//! Binance public API client for market data (no authentication required)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::source::PriceDataSource;
use crate::types::Candle;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const MAX_KLINES_PER_REQUEST: u32 = 1000;

/// Binance public market data client
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

/// Raw kline data from Binance API (array of arrays)
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct RawKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    u64,    // 8: Number of trades
    String, // 9: Taker buy base
    String, // 10: Taker buy quote
    String, // 11: Ignore
);

impl RawKline {
    fn into_candle(self) -> Result<Candle, SourceError> {
        let num = |field: &str, name: &str| {
            field
                .parse::<f64>()
                .map_err(|e| SourceError::Decode(format!("{name} '{field}': {e}")))
        };
        Ok(Candle {
            timestamp: self.0,
            open: num(&self.1, "open")?,
            high: num(&self.2, "high")?,
            low: num(&self.3, "low")?,
            close: num(&self.4, "close")?,
            volume: num(&self.5, "volume")?,
        })
    }
}

/// Decode a klines response body into candles
fn parse_klines(body: &str) -> Result<Vec<Candle>, SourceError> {
    let raw: Vec<RawKline> =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    raw.into_iter().map(RawKline::into_candle).collect()
}

impl BinanceClient {
    /// Create a new Binance client with default base URL
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: base_url.into(),
        })
    }

    /// Fetch the most recent `limit` klines for a symbol
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, SourceError> {
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, symbol, interval, limit
        );

        debug!(symbol, interval, limit, "Fetching klines from Binance");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api { status, body });
        }

        let body = response.text().await?;
        let candles = parse_klines(&body)?;
        if candles.is_empty() {
            return Err(SourceError::Empty {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }

        debug!(count = candles.len(), "Fetched klines");
        Ok(candles)
    }
}

#[async_trait]
impl PriceDataSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, SourceError> {
        self.get_klines(symbol, interval, limit).await
    }
}
