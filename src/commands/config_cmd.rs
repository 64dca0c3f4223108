use anyhow::Result;
use clap::Subcommand;
use std::process::ExitCode;

use crate::config::{config_dir, AppConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set one key and persist it
    Set { key: String, value: String },
}

pub fn execute(action: Option<ConfigAction>) -> Result<ExitCode> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            println!("config dir: {}", config_dir().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        ConfigAction::Set { key, value } => {
            let mut config = AppConfig::load()?;
            if let Err(e) = config.set(&key, &value) {
                eprintln!("{e:#}");
                return Ok(ExitCode::from(1));
            }
            config.save()?;
            println!("{key} = {value}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
