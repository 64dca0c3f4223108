use anyhow::Result;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::process::ExitCode;

use dicebot_db::ProfileStore;
use dicebot_models::{Currency, Profile, SessionMode, StopConditions};

use crate::config::config_dir;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// List saved profiles
    List,
    /// Save a profile under a name
    Save(SaveArgs),
    /// Print a saved profile
    Load { name: String },
    /// Delete a saved profile
    Delete { name: String },
}

#[derive(Args)]
pub struct SaveArgs {
    pub name: String,

    #[arg(long)]
    pub strategy: String,

    #[arg(short = 'P', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    #[arg(long, default_value = "simulation")]
    pub mode: String,

    #[arg(long, default_value = "btc")]
    pub currency: String,

    #[arg(long)]
    pub max_bets: Option<u64>,

    #[arg(long)]
    pub max_losses: Option<u64>,

    #[arg(long)]
    pub max_wins: Option<u64>,

    #[arg(long, allow_hyphen_values = true)]
    pub stop_loss: Option<Decimal>,

    #[arg(long)]
    pub take_profit: Option<Decimal>,

    #[arg(long)]
    pub seed: Option<u64>,
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("'{raw}' is not of the form key=value"))
}

pub async fn execute(action: ProfileAction) -> Result<ExitCode> {
    let store = ProfileStore::open(&config_dir());
    match action {
        ProfileAction::List => {
            let profiles = store.list()?;
            if profiles.is_empty() {
                println!("no saved profiles");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<20} {:<24} {:<12} currency", "name", "strategy", "mode");
            for profile in profiles {
                println!(
                    "{:<20} {:<24} {:<12} {}",
                    profile.name, profile.strategy, profile.mode, profile.currency
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        ProfileAction::Save(args) => {
            let mode: SessionMode = match args.mode.parse() {
                Ok(mode) => mode,
                Err(_) => {
                    eprintln!("unknown mode '{}'", args.mode);
                    return Ok(ExitCode::from(1));
                }
            };
            if dicebot_strategies::build(&args.strategy).is_none() {
                eprintln!("unknown strategy '{}'", args.strategy);
                return Ok(ExitCode::from(1));
            }
            let params: HashMap<String, String> = args.params.into_iter().collect();
            let profile = Profile {
                name: args.name.clone(),
                strategy: args.strategy,
                params,
                mode,
                currency: Currency::new(&args.currency),
                stop: StopConditions {
                    max_bets: args.max_bets,
                    max_losses: args.max_losses,
                    max_wins: args.max_wins,
                    stop_loss: args.stop_loss,
                    take_profit: args.take_profit,
                },
                base_bet: None,
                seed: args.seed,
            };
            store.save(&profile)?;
            println!("saved profile '{}'", args.name);
            Ok(ExitCode::SUCCESS)
        }
        ProfileAction::Load { name } => match store.load(&name)? {
            Some(profile) => {
                println!("{}", serde_json::to_string_pretty(&profile)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("no profile named '{name}'");
                Ok(ExitCode::from(1))
            }
        },
        ProfileAction::Delete { name } => {
            if store.delete(&name)? {
                println!("deleted profile '{name}'");
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("no profile named '{name}'");
                Ok(ExitCode::from(1))
            }
        }
    }
}
