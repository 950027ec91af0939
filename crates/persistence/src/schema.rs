//! Database schema definitions

/// SQL to create all tables
/// NOTE: the full analysis result is stored as JSON; the scalar columns are
/// copies kept for listing and filtering
pub const CREATE_TABLES: &str = r#"
-- Analysis snapshots (one per symbol/interval/last candle/result)
CREATE TABLE IF NOT EXISTS analysis_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    snapshot_hash TEXT NOT NULL UNIQUE,
    symbol TEXT NOT NULL,
    interval TEXT NOT NULL,
    as_of INTEGER NOT NULL,
    current_price REAL NOT NULL,
    trend TEXT NOT NULL,
    alert_count INTEGER NOT NULL DEFAULT 0,
    result_json TEXT NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_snapshots_symbol ON analysis_snapshots(symbol, as_of DESC);
CREATE INDEX IF NOT EXISTS idx_snapshots_created ON analysis_snapshots(created_at DESC)
"#;
