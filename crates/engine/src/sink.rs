//! Alert delivery channels

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::types::{Alert, AlertPriority};

/// A notification channel for alerts of one symbol
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, symbol: &str, alerts: &[Alert]) -> Result<(), SinkError>;
}

/// One line per alert, shared by every sink
pub fn format_alert(symbol: &str, alert: &Alert) -> String {
    let marker = match alert.priority {
        AlertPriority::Critical => "🚨",
        AlertPriority::High => "⚠️",
        AlertPriority::Medium => "📍",
        AlertPriority::Low => "ℹ️",
    };
    format!("{marker} {symbol}: {}", alert.message)
}

/// Writes alerts to the tracing log
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, symbol: &str, alerts: &[Alert]) -> Result<(), SinkError> {
        for alert in alerts {
            info!(
                symbol,
                priority = ?alert.priority,
                price_level = alert.level,
                "{}",
                alert.message
            );
        }
        Ok(())
    }
}

// ============================================================================
// Webhook
// ============================================================================

/// Sliding one-minute window of send timestamps
struct RateLimiter {
    max_per_minute: usize,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_minute,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    async fn try_acquire(&self) -> bool {
        let window = Duration::from_secs(60);
        let mut sent = self.sent.lock().await;
        while sent.front().is_some_and(|t| t.elapsed() >= window) {
            sent.pop_front();
        }
        if sent.len() >= self.max_per_minute {
            return false;
        }
        sent.push_back(Instant::now());
        true
    }
}

/// Posts `{"content": ...}` JSON (Discord-compatible) to a webhook URL
pub struct WebhookAlertSink {
    client: Client,
    url: String,
    limiter: RateLimiter,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, max_per_minute: usize) -> Result<Self, SinkError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            url: url.into(),
            limiter: RateLimiter::new(max_per_minute),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, symbol: &str, alerts: &[Alert]) -> Result<(), SinkError> {
        for alert in alerts {
            if !self.limiter.try_acquire().await {
                warn!(symbol, message = %alert.message, "Webhook rate limited, skipping");
                return Err(SinkError::RateLimited(self.limiter.max_per_minute));
            }

            let response = self
                .client
                .post(&self.url)
                .json(&json!({ "content": format_alert(symbol, alert) }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(SinkError::Rejected(response.status().as_u16()));
            }
        }
        Ok(())
    }
}
