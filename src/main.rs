mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{compare, config_cmd, interactive, profiles, repair, run, strategies, verify};

#[derive(Parser)]
#[command(
    name = "dicebot",
    version,
    about = "Automated strategy-driven betting toolkit for dice gambling services"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the strategy catalog with risk ratings
    Strategies,
    /// Show one strategy's parameters, pros, cons and tips
    Show {
        /// Catalog name, e.g. classic-martingale
        strategy: String,
    },
    /// Show or change persisted defaults
    Config {
        #[command(subcommand)]
        action: Option<config_cmd::ConfigAction>,
    },
    /// Manage saved run profiles
    Profiles {
        #[command(subcommand)]
        action: profiles::ProfileAction,
    },
    /// Run an auto-bet session
    Run(run::RunArgs),
    /// Run every strategy against the simulator and write an HTML report
    Compare(compare::CompareArgs),
    /// Guided wizard that builds and starts a run
    Interactive,
    /// Recompute provably-fair rolls for a stored session
    Verify(verify::VerifyArgs),
    /// Fold crashed sessions' journals back into the index
    Repair,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dicebot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage problems exit 1; --help and --version exit 0.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let outcome = match cli.command {
        Command::Strategies => strategies::list(),
        Command::Show { strategy } => strategies::show(&strategy),
        Command::Config { action } => config_cmd::execute(action),
        Command::Profiles { action } => profiles::execute(action).await,
        Command::Run(args) => run::execute(args).await,
        Command::Compare(args) => compare::execute(args).await,
        Command::Interactive => interactive::execute().await,
        Command::Verify(args) => verify::execute(args).await,
        Command::Repair => repair::execute().await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
