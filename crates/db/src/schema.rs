use sqlx::FromRow;

/// DDL for the session index. Applied at connect time; every statement is
/// idempotent so reconnecting is safe.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    session_id       TEXT PRIMARY KEY,
    start_ts         TEXT NOT NULL,
    end_ts           TEXT,
    mode             TEXT NOT NULL,
    strategy         TEXT NOT NULL,
    currency         TEXT NOT NULL,
    params_json      TEXT NOT NULL,
    starting_balance TEXT NOT NULL,
    ending_balance   TEXT,
    bet_count        INTEGER NOT NULL DEFAULT 0,
    win_count        INTEGER NOT NULL DEFAULT 0,
    profit           TEXT NOT NULL DEFAULT '0',
    stop_reason      TEXT
);

CREATE TABLE IF NOT EXISTS bets (
    bet_id        TEXT NOT NULL,
    session_id    TEXT NOT NULL,
    ts            TEXT NOT NULL,
    stake         TEXT NOT NULL,
    chance        TEXT NOT NULL,
    side          TEXT NOT NULL,
    won           INTEGER NOT NULL,
    profit        TEXT NOT NULL,
    balance_after TEXT NOT NULL,
    PRIMARY KEY (session_id, bet_id)
);

CREATE INDEX IF NOT EXISTS idx_bets_session_ts ON bets (session_id, ts);
CREATE INDEX IF NOT EXISTS idx_sessions_strategy_start ON sessions (strategy, start_ts);
";

/// A `sessions` row. Money travels as TEXT; the money module decodes it.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub session_id: String,
    pub start_ts: String,
    pub end_ts: Option<String>,
    pub mode: String,
    pub strategy: String,
    pub currency: String,
    pub params_json: String,
    pub starting_balance: String,
    pub ending_balance: Option<String>,
    pub bet_count: i64,
    pub win_count: i64,
    pub profit: String,
    pub stop_reason: Option<String>,
}

/// A `bets` row.
#[derive(Debug, Clone, FromRow)]
pub struct BetRow {
    pub bet_id: String,
    pub session_id: String,
    pub ts: String,
    pub stake: String,
    pub chance: String,
    pub side: String,
    pub won: bool,
    pub profit: String,
    pub balance_after: String,
}
