use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use dicebot_models::{BetResult, BotError, Result, Session, SessionSummary};

/// One line of a session journal. `monotonic_ts` is milliseconds on the
/// session's monotonic clock, so journals from identical simulated runs
/// compare equal byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum JournalEvent {
    SessionStarted(Session),
    BetAdjusted {
        bet_index: u64,
        detail: serde_json::Value,
    },
    BetExecuted(BetResult),
    FaucetClaimed {
        amount: rust_decimal::Decimal,
        balance_after: rust_decimal::Decimal,
    },
    SessionStopped(SessionSummary),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    #[serde(flatten)]
    pub event: JournalEvent,
    pub monotonic_ts: u64,
}

/// Append-only JSONL journal, one per session, single writer. The journal
/// is the durability source of truth: the SQLite index is rebuilt from it.
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Create `<dir>/<session_id>.jsonl`, creating the directory as needed.
    pub fn create(dir: &Path, session_id: Uuid) -> Result<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| BotError::Journal(format!("creating {}: {e}", dir.display())))?;
        let path = dir.join(format!("{session_id}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BotError::Journal(format!("opening {}: {e}", path.display())))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, event: JournalEvent, monotonic_ts: u64) -> Result<()> {
        let record = JournalRecord { event, monotonic_ts };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .map_err(|e| BotError::Journal(format!("appending to {}: {e}", self.path.display())))
    }

    /// Flush and fsync. Called once, when the session stops; after it
    /// returns the journal is durable.
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .flush()
            .and_then(|()| self.file.sync_all())
            .map_err(|e| BotError::Journal(format!("syncing {}: {e}", self.path.display())))
    }
}

/// Read a journal back into records, in order.
pub fn read_journal(path: &Path) -> Result<Vec<JournalRecord>> {
    let file = File::open(path)
        .map_err(|e| BotError::Journal(format!("opening {}: {e}", path.display())))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line =
            line.map_err(|e| BotError::Journal(format!("reading {}: {e}", path.display())))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// The executed bets of a journal, in order.
pub fn journal_bets(path: &Path) -> Result<Vec<BetResult>> {
    Ok(read_journal(path)?
        .into_iter()
        .filter_map(|record| match record.event {
            JournalEvent::BetExecuted(result) => Some(result),
            _ => None,
        })
        .collect())
}

/// The dice rolls of a journal, for historical replay.
pub fn journal_rolls(path: &Path) -> Result<Vec<rust_decimal::Decimal>> {
    Ok(journal_bets(path)?.into_iter().map(|r| r.roll).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::{BetSide, BetSpec, Currency, SessionMode, StopReason};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn session(id: Uuid) -> Session {
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

    fn bet(i: u64) -> BetResult {
        BetResult {
            bet_id: format!("sim-{i}"),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(49.5), BetSide::High),
            roll: dec!(12.345),
            won: false,
            profit: dec!(-1),
            balance_after: dec!(99),
            fairness: None,
        }
    }

    fn summary(id: Uuid) -> SessionSummary {
        SessionSummary {
            session_id: id,
            stop_reason: StopReason::MaxBets,
            bets: 2,
            wins: 0,
            losses: 2,
            starting_balance: dec!(100),
            ending_balance: dec!(98),
            profit: dec!(-2),
            total_wagered: dec!(2),
            max_win_streak: 0,
            max_loss_streak: 2,
            duration: Duration::from_secs(1),
        }
    }

    #[test]
    fn round_trips_the_full_event_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();

        let mut journal = Journal::create(dir.path(), id).unwrap();
        journal
            .append(JournalEvent::SessionStarted(session(id)), 0)
            .unwrap();
        journal.append(JournalEvent::BetExecuted(bet(1)), 10).unwrap();
        journal.append(JournalEvent::BetExecuted(bet(2)), 20).unwrap();
        journal
            .append(JournalEvent::SessionStopped(summary(id)), 30)
            .unwrap();
        journal.sync().unwrap();

        let records = read_journal(journal.path()).unwrap();
        assert_eq!(records.len(), 4);
        assert!(matches!(records[0].event, JournalEvent::SessionStarted(_)));
        assert!(matches!(records[3].event, JournalEvent::SessionStopped(_)));
        assert_eq!(records[2].monotonic_ts, 20);

        let bets = journal_bets(journal.path()).unwrap();
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].bet_id, "sim-1");

        let rolls = journal_rolls(journal.path()).unwrap();
        assert_eq!(rolls, vec![dec!(12.345), dec!(12.345)]);
    }

    #[test]
    fn reopening_after_sync_preserves_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let path = {
            let mut journal = Journal::create(dir.path(), id).unwrap();
            journal
                .append(JournalEvent::SessionStarted(session(id)), 0)
                .unwrap();
            journal.append(JournalEvent::BetExecuted(bet(1)), 5).unwrap();
            journal
                .append(JournalEvent::SessionStopped(summary(id)), 9)
                .unwrap();
            journal.sync().unwrap();
            journal.path().to_path_buf()
        };

        let first = fs::read_to_string(&path).unwrap();
        let records = read_journal(&path).unwrap();
        assert_eq!(records.len(), 3);
        // A second read sees the identical byte sequence.
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }
}
