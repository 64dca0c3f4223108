use anyhow::Result;
use std::process::ExitCode;

use dicebot_db::{connect, SessionRepository};

use crate::config::{history_db_path, journal_dir};

/// `repair`: fold journals whose sessions never reached the index (a
/// crashed process, a missing database) back into SQLite. Sessions are
/// never resumed; the journal is simply closed out.
pub async fn execute() -> Result<ExitCode> {
    let pool = connect(&history_db_path()).await?;
    let repository = SessionRepository::new(pool);
    let imported = repository.repair_from_journals(&journal_dir()).await?;
    println!("re-imported {imported} journal(s)");
    Ok(ExitCode::SUCCESS)
}
