//! Analysis snapshot repository: stored analysis results per symbol

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};

/// A persisted analysis snapshot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SnapshotRecord {
    pub id: i64,
    pub snapshot_hash: String,
    pub symbol: String,
    pub interval: String,
    pub as_of: i64,
    pub current_price: f64,
    pub trend: String,
    pub alert_count: i64,
    pub result_json: String,
    pub created_at: Option<i64>,
}

/// Fields of a snapshot about to be stored
#[derive(Debug, Clone)]
pub struct NewSnapshot<'a> {
    pub symbol: &'a str,
    pub interval: &'a str,
    pub as_of: i64,
    pub current_price: f64,
    pub trend: &'a str,
    pub alert_count: i64,
    pub result_json: &'a str,
}

impl NewSnapshot<'_> {
    /// SHA-256 over the identifying fields, hex encoded
    pub fn hash(&self) -> String {
        let as_of = self.as_of.to_string();
        let mut hasher = Sha256::new();
        for part in [self.symbol, self.interval, as_of.as_str(), self.result_json] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Repository for analysis snapshots
pub struct SnapshotRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a snapshot (INSERT OR IGNORE, skips if the hash already exists).
    /// Returns true when a new row was written.
    pub async fn save(&self, snapshot: &NewSnapshot<'_>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO analysis_snapshots (
                snapshot_hash, symbol, interval, as_of, current_price,
                trend, alert_count, result_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.hash())
        .bind(snapshot.symbol)
        .bind(snapshot.interval)
        .bind(snapshot.as_of)
        .bind(snapshot.current_price)
        .bind(snapshot.trend)
        .bind(snapshot.alert_count)
        .bind(snapshot.result_json)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Most recent snapshot for a symbol (by last candle, then insertion)
    pub async fn latest(&self, symbol: &str) -> DbResult<Option<SnapshotRecord>> {
        let record = sqlx::query_as::<_, SnapshotRecord>(
            r#"
            SELECT * FROM analysis_snapshots
            WHERE symbol = ?
            ORDER BY as_of DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Newest-first snapshots for a symbol
    pub async fn history(&self, symbol: &str, limit: i64) -> DbResult<Vec<SnapshotRecord>> {
        let records = sqlx::query_as::<_, SnapshotRecord>(
            r#"
            SELECT * FROM analysis_snapshots
            WHERE symbol = ?
            ORDER BY as_of DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Distinct symbols with at least one snapshot, alphabetical
    pub async fn symbols(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT symbol FROM analysis_snapshots ORDER BY symbol")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(|(s,)| s).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn snapshot<'a>(symbol: &'a str, as_of: i64, json: &'a str) -> NewSnapshot<'a> {
        NewSnapshot {
            symbol,
            interval: "1h",
            as_of,
            current_price: 100.5,
            trend: "bullish",
            alert_count: 2,
            result_json: json,
        }
    }

    #[test]
    fn test_hash_depends_on_every_field() {
        let base = snapshot("BTCUSDT", 1, "{}").hash();
        assert_eq!(base.len(), 64);
        assert_eq!(base, snapshot("BTCUSDT", 1, "{}").hash());
        assert_ne!(base, snapshot("ETHUSDT", 1, "{}").hash());
        assert_ne!(base, snapshot("BTCUSDT", 2, "{}").hash());
        assert_ne!(base, snapshot("BTCUSDT", 1, "{\"a\":1}").hash());
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.snapshots();

        assert!(repo.save(&snapshot("BTCUSDT", 1000, "{}")).await.unwrap());
        assert!(!repo.save(&snapshot("BTCUSDT", 1000, "{}")).await.unwrap());
        assert_eq!(repo.history("BTCUSDT", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_and_history_order() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.snapshots();

        for as_of in [1000, 3000, 2000] {
            repo.save(&snapshot("BTCUSDT", as_of, "{}")).await.unwrap();
        }
        repo.save(&snapshot("ETHUSDT", 5000, "{}")).await.unwrap();

        let latest = repo.latest("BTCUSDT").await.unwrap().unwrap();
        assert_eq!(latest.as_of, 3000);
        assert_eq!(latest.trend, "bullish");
        assert_eq!(latest.alert_count, 2);

        let history = repo.history("BTCUSDT", 2).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|r| r.as_of).collect();
        assert_eq!(stamps, vec![3000, 2000]);

        assert!(repo.latest("SOLUSDT").await.unwrap().is_none());
        assert_eq!(repo.symbols().await.unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
    }
}
