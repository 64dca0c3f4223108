use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::process::ExitCode;

use dicebot_strategies::catalog;

use crate::commands::run::{self, RunArgs};

/// `interactive`: walk the user through building a `run` invocation.
pub async fn execute() -> Result<ExitCode> {
    let theme = ColorfulTheme::default();

    let entries = catalog();
    let labels: Vec<String> = entries
        .iter()
        .map(|entry| {
            let meta = ((entry.build)()).metadata();
            format!("{} {}: {}", meta.risk_level.emoji(), meta.name, meta.summary)
        })
        .collect();
    let strategy_idx = Select::with_theme(&theme)
        .with_prompt("Strategy")
        .items(&labels)
        .default(0)
        .interact()?;
    let strategy = entries[strategy_idx].name.to_string();

    let modes = ["simulation", "live-main", "live-faucet"];
    let mode_idx = Select::with_theme(&theme)
        .with_prompt("Mode")
        .items(&modes)
        .default(0)
        .interact()?;

    let currency: String = Input::with_theme(&theme)
        .with_prompt("Currency")
        .default("btc".to_string())
        .interact_text()?;

    // Offer every schema parameter with its default prefilled; keeping the
    // default leaves the binding out so the schema default applies.
    let mut params = Vec::new();
    let schema = ((entries[strategy_idx].build)()).metadata().params;
    for spec in &schema {
        let answer: String = Input::with_theme(&theme)
            .with_prompt(format!("{} ({})", spec.name, spec.description))
            .default(spec.default.to_string())
            .interact_text()?;
        if answer != spec.default.to_string() {
            params.push((spec.name.to_string(), answer));
        }
    }

    let max_bets: String = Input::with_theme(&theme)
        .with_prompt("Max bets (empty = unlimited)")
        .allow_empty(true)
        .interact_text()?;
    let stop_loss: String = Input::with_theme(&theme)
        .with_prompt("Stop loss, negative P/L (empty = none)")
        .allow_empty(true)
        .interact_text()?;
    let take_profit: String = Input::with_theme(&theme)
        .with_prompt("Take profit (empty = none)")
        .allow_empty(true)
        .interact_text()?;

    let args = RunArgs {
        mode: modes[mode_idx].to_string(),
        strategy: Some(strategy),
        params,
        profile: None,
        max_bets: parse_opt(&max_bets)?,
        max_losses: None,
        max_wins: None,
        stop_loss: parse_opt(&stop_loss)?,
        take_profit: parse_opt(&take_profit)?,
        currency: Some(currency),
        seed: None,
        balance: None,
    };

    if !Confirm::with_theme(&theme)
        .with_prompt("Start the session?")
        .default(true)
        .interact()?
    {
        println!("aborted");
        return Ok(ExitCode::SUCCESS);
    }

    run::execute(args).await
}

fn parse_opt<T: std::str::FromStr>(raw: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.parse()?))
    }
}
