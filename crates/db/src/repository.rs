use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

use dicebot_models::{money, BetKind, BetResult, BetSide, Session, SessionSummary};

use crate::journal::{read_journal, JournalEvent};
use crate::schema::{BetRow, SessionRow};

/// Reader/writer over the SQLite session index. Writers keep transactions
/// short; the journal remains the durability source of truth and the index
/// is always reconstructible from it.
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sessions \
             (session_id, start_ts, end_ts, mode, strategy, currency, params_json, \
              starting_balance, ending_balance, bet_count, win_count, profit, stop_reason) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.session_id.to_string())
        .bind(session.start_time.to_rfc3339())
        .bind(session.end_time.map(|t| t.to_rfc3339()))
        .bind(session.mode.to_string())
        .bind(&session.strategy)
        .bind(session.currency.as_str())
        .bind(session.params_json.to_string())
        .bind(money::format_amount(session.starting_balance))
        .bind(session.ending_balance.map(money::format_amount))
        .bind(session.bet_count as i64)
        .bind(session.win_count as i64)
        .bind(money::format_amount(session.profit))
        .bind(session.stop_reason.as_ref().map(ToString::to_string))
        .execute(&self.pool)
        .await
        .context("inserting session row")?;
        Ok(())
    }

    pub async fn finalize_session(&self, summary: &SessionSummary, end_ts: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET end_ts = ?, ending_balance = ?, bet_count = ?, \
             win_count = ?, profit = ?, stop_reason = ? WHERE session_id = ?",
        )
        .bind(end_ts)
        .bind(money::format_amount(summary.ending_balance))
        .bind(summary.bets as i64)
        .bind(summary.wins as i64)
        .bind(money::format_amount(summary.profit))
        .bind(summary.stop_reason.to_string())
        .bind(summary.session_id.to_string())
        .execute(&self.pool)
        .await
        .context("finalizing session row")?;
        Ok(())
    }

    /// Insert a batch of executed bets in one short transaction.
    pub async fn insert_bets(&self, session_id: &str, bets: &[BetResult]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for bet in bets {
            let (chance, side) = describe_spec(&bet.spec.kind);
            sqlx::query(
                "INSERT OR REPLACE INTO bets \
                 (bet_id, session_id, ts, stake, chance, side, won, profit, balance_after) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&bet.bet_id)
            .bind(session_id)
            .bind(bet.timestamp.to_rfc3339())
            .bind(money::format_amount(bet.spec.amount))
            .bind(chance)
            .bind(side)
            .bind(bet.won)
            .bind(bet.profit.to_string())
            .bind(money::format_amount(bet.balance_after))
            .execute(&mut *tx)
            .await
            .context("inserting bet row")?;
        }
        tx.commit().await.context("committing bet batch")?;
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions ORDER BY start_ts DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn session_bets(&self, session_id: &str) -> Result<Vec<BetRow>> {
        let rows = sqlx::query_as::<_, BetRow>(
            "SELECT * FROM bets WHERE session_id = ? ORDER BY ts, bet_id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Fold a finished journal into the index: session row, final state and
    /// every executed bet. Used at session stop and by the offline repair
    /// pass; replays are idempotent.
    pub async fn reconcile_journal(&self, path: &Path) -> Result<()> {
        let records = read_journal(path).context("reading journal for reconciliation")?;
        let mut session: Option<Session> = None;
        let mut bets: Vec<BetResult> = Vec::new();
        let mut summary: Option<SessionSummary> = None;

        for record in records {
            match record.event {
                JournalEvent::SessionStarted(s) => session = Some(s),
                JournalEvent::BetExecuted(bet) => bets.push(bet),
                JournalEvent::SessionStopped(s) => summary = Some(s),
                JournalEvent::BetAdjusted { .. } | JournalEvent::FaucetClaimed { .. } => {}
            }
        }

        let Some(session) = session else {
            warn!("📄 Journal {} has no session_started record, skipping", path.display());
            return Ok(());
        };
        let session_id = session.session_id.to_string();
        self.insert_session(&session).await?;
        self.insert_bets(&session_id, &bets).await?;
        if let Some(summary) = summary {
            let end_ts = bets
                .last()
                .map_or_else(|| session.start_time.to_rfc3339(), |b| b.timestamp.to_rfc3339());
            self.finalize_session(&summary, &end_ts).await?;
        }
        Ok(())
    }

    /// Offline repair: fold every journal in `dir` whose session is missing
    /// or unfinished in the index. Returns how many journals were imported.
    pub async fn repair_from_journals(&self, dir: &Path) -> Result<usize> {
        let mut imported = 0;
        if !dir.exists() {
            return Ok(0);
        }
        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("reading journal dir {}", dir.display()))?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        entries.sort();

        for path in entries {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let known = self
                .session(&stem)
                .await?
                .is_some_and(|row| row.end_ts.is_some());
            if known {
                continue;
            }
            match self.reconcile_journal(&path).await {
                Ok(()) => {
                    imported += 1;
                    info!("🔧 Re-imported journal {}", path.display());
                }
                Err(e) => warn!("📄 Skipping journal {}: {e}", path.display()),
            }
        }
        Ok(imported)
    }
}

fn describe_spec(kind: &BetKind) -> (String, String) {
    match kind {
        BetKind::Dice { chance, side } => (
            chance.to_string(),
            match side {
                BetSide::High => "high".to_string(),
                BetSide::Low => "low".to_string(),
            },
        ),
        BetKind::Range { low, high, mode } => (
            kind.win_chance_percent().to_string(),
            format!(
                "range-{}[{low},{high}]",
                match mode {
                    dicebot_models::RangeMode::In => "in",
                    dicebot_models::RangeMode::Out => "out",
                }
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_in_memory;
    use crate::journal::{Journal, JournalEvent};
    use chrono::Utc;
    use dicebot_models::{BetSpec, Currency, SessionMode, StopReason};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use uuid::Uuid;

    fn sample_session(id: Uuid) -> Session {
        Session {
            session_id: id,
            start_time: Utc::now(),
            end_time: None,
            mode: SessionMode::Simulation,
            currency: Currency::new("btc"),
            strategy: "flat".into(),
            params_json: serde_json::json!({"base": "1"}),
            starting_balance: dec!(100),
            ending_balance: None,
            stop_reason: None,
            bet_count: 0,
            win_count: 0,
            profit: dec!(0),
        }
    }

    fn sample_bet(i: u64) -> BetResult {
        BetResult {
            bet_id: format!("sim-{i}"),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(49.5), BetSide::High),
            roll: dec!(55.5),
            won: true,
            profit: dec!(0.94),
            balance_after: dec!(100.94),
            fairness: None,
        }
    }

    #[tokio::test]
    async fn sessions_and_bets_round_trip() {
        let pool = connect_in_memory().await.unwrap();
        let repo = SessionRepository::new(pool);
        let id = Uuid::new_v4();

        repo.insert_session(&sample_session(id)).await.unwrap();
        repo.insert_bets(&id.to_string(), &[sample_bet(1), sample_bet(2)])
            .await
            .unwrap();

        let summary = SessionSummary {
            session_id: id,
            stop_reason: StopReason::TakeProfit,
            bets: 2,
            wins: 2,
            losses: 0,
            starting_balance: dec!(100),
            ending_balance: dec!(101.88),
            profit: dec!(1.88),
            total_wagered: dec!(2),
            max_win_streak: 2,
            max_loss_streak: 0,
            duration: Duration::from_secs(2),
        };
        repo.finalize_session(&summary, &Utc::now().to_rfc3339())
            .await
            .unwrap();

        let row = repo.session(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(row.strategy, "flat");
        assert_eq!(row.stop_reason.as_deref(), Some("take_profit"));
        assert_eq!(row.bet_count, 2);
        assert_eq!(row.ending_balance.as_deref(), Some("101.88000000"));

        let bets = repo.session_bets(&id.to_string()).await.unwrap();
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].side, "high");
        assert!(bets[0].won);
    }

    #[tokio::test]
    async fn reconcile_rebuilds_the_index_from_a_journal() {
        let pool = connect_in_memory().await.unwrap();
        let repo = SessionRepository::new(pool);
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();

        let mut journal = Journal::create(dir.path(), id).unwrap();
        journal
            .append(JournalEvent::SessionStarted(sample_session(id)), 0)
            .unwrap();
        journal
            .append(JournalEvent::BetExecuted(sample_bet(1)), 5)
            .unwrap();
        let summary = SessionSummary {
            session_id: id,
            stop_reason: StopReason::MaxBets,
            bets: 1,
            wins: 1,
            losses: 0,
            starting_balance: dec!(100),
            ending_balance: dec!(100.94),
            profit: dec!(0.94),
            total_wagered: dec!(1),
            max_win_streak: 1,
            max_loss_streak: 0,
            duration: Duration::from_millis(5),
        };
        journal
            .append(JournalEvent::SessionStopped(summary), 6)
            .unwrap();
        journal.sync().unwrap();

        // First repair imports the journal, the second finds nothing to do.
        assert_eq!(repo.repair_from_journals(dir.path()).await.unwrap(), 1);
        assert_eq!(repo.repair_from_journals(dir.path()).await.unwrap(), 0);

        let row = repo.session(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(row.bet_count, 1);
        assert!(row.end_ts.is_some());
    }
}
