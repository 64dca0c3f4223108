use anyhow::{Context, Result};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;

use dicebot_models::money;
use dicebot_services::{render_html, run_comparison, CompareConfig};

use crate::config::AppConfig;

/// `compare`: sweep the whole catalog under one simulator configuration.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Starting balance every strategy gets
    #[arg(long, default_value = "10")]
    pub balance: Decimal,

    /// Bet budget per strategy
    #[arg(long, default_value = "2000")]
    pub max_bets: u64,

    /// Shared simulator seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Where to write the HTML report
    #[arg(long, default_value = "report.html")]
    pub output: PathBuf,
}

pub async fn execute(args: CompareArgs) -> Result<ExitCode> {
    let app = AppConfig::load()?;
    let mut config = CompareConfig::new(args.balance, args.max_bets, args.seed);
    config.house_edge = app.house_edge;
    config.min_bet = app.min_bet;
    config.currency = dicebot_models::Currency::new(&app.currency);

    let report = run_comparison(config).await;

    println!(
        "{:<26} {:>6} {:>9} {:>16} {:>8}  stop",
        "strategy", "bets", "win rate", "profit", "roi"
    );
    println!("{}", "-".repeat(86));
    for outcome in &report.outcomes {
        match (&outcome.summary, &outcome.performance) {
            (Some(summary), Some(perf)) => println!(
                "{} {:<24} {:>6} {:>8.1}% {:>16} {:>7.2}%  {}{}",
                outcome.risk_emoji,
                outcome.name,
                summary.bets,
                perf.win_rate * 100.0,
                money::format_amount(summary.profit),
                perf.roi * 100.0,
                summary.stop_reason,
                if outcome.busted { " 💀" } else { "" }
            ),
            _ => println!(
                "  {:<24} failed: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or("unknown")
            ),
        }
    }
    for (name, reason) in &report.skipped {
        println!("⏭️ {name:<24} skipped: {reason}");
    }

    let html = render_html(&report);
    std::fs::write(&args.output, html)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("\nreport written to {}", args.output.display());

    Ok(ExitCode::SUCCESS)
}
