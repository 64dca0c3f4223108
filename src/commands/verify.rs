use anyhow::Result;
use clap::Args;
use std::process::ExitCode;

use dicebot_db::journal_bets;
use dicebot_services::verify_batch;

use crate::config::journal_dir;

/// `verify`: recompute every provably-fair roll in a stored session and
/// compare against what the house reported.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Session id (journal file stem under bet_history/auto)
    pub session: String,
}

pub async fn execute(args: VerifyArgs) -> Result<ExitCode> {
    let path = journal_dir().join(format!("{}.jsonl", args.session));
    if !path.exists() {
        eprintln!("no journal at {}", path.display());
        return Ok(ExitCode::from(1));
    }

    let bets = journal_bets(&path)?;
    if bets.is_empty() {
        println!("journal holds no executed bets");
        return Ok(ExitCode::SUCCESS);
    }

    let report = verify_batch(&bets);
    println!("checked:      {}", report.checked);
    println!("passed:       {}", report.passed);
    println!("missing seed: {}", report.missing_seed);
    println!("pass rate:    {:.2}%", report.pass_rate() * 100.0);

    if report.failing_bet_ids.is_empty() {
        println!("all verifiable rolls check out ✔");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("FAILING bets:");
        for id in &report.failing_bet_ids {
            println!("  {id}");
        }
        Ok(ExitCode::from(1))
    }
}
