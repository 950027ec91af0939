//! Persistence layer for SMC Scan
//!
//! SQLite storage for analysis snapshots, one row per (symbol, interval,
//! last candle, result) combination.

pub mod repository;
pub mod schema;

pub use repository::{NewSnapshot, SnapshotRecord, SnapshotRepository};
pub use sqlx::sqlite::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Applied to every new connection pool
const PRAGMAS: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    // 8 MB (negative = KiB)
    ("cache_size", "-8000"),
];

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) a database file
    pub async fn new(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        Self::open(&format!("sqlite:{}?mode=rwc", path.display()), 5).await
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> DbResult<Self> {
        Self::open("sqlite::memory:", 1).await
    }

    async fn open(url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.create_tables().await?;
        db.configure_pragmas().await?;
        debug!(url, "Database ready");

        Ok(db)
    }

    /// Execute each schema statement individually
    async fn create_tables(&self) -> DbResult<()> {
        for statement in schema::CREATE_TABLES.split(';') {
            // Strip comment-only lines, then check if any SQL remains
            let sql: String = statement
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n");
            let sql = sql.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DbError::Migration(format!("{e}: {sql}")))?;
        }
        Ok(())
    }

    async fn configure_pragmas(&self) -> DbResult<()> {
        for (name, value) in PRAGMAS {
            sqlx::query(&format!("PRAGMA {name}={value}"))
                .execute(&self.pool)
                .await
                .map_err(|e| DbError::Connection(format!("{name} pragma failed: {e}")))?;
        }
        Ok(())
    }

    pub fn snapshots(&self) -> SnapshotRepository<'_> {
        SnapshotRepository::new(&self.pool)
    }
}
