use anyhow::{anyhow, Result};
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use dicebot_db::{connect, journal_bets, ProfileStore, SessionRepository};
use dicebot_models::{
    money, BotError, Currency, Params, SessionMode, SessionSummary, StopConditions, StopReason,
    StrategyError,
};
use dicebot_services::{
    control_channel, AutoBetEngine, Clock, DiceApi, DiceSimulator, EngineConfig, LiveDiceClient,
    MetricsAccumulator, SimulatorConfig, SystemClock, VirtualClock,
};

use crate::config::{api_key, config_dir, history_db_path, journal_dir, AppConfig};

/// `run`: start one auto-bet session.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// simulation, live-main or live-faucet
    #[arg(long, default_value = "simulation")]
    pub mode: String,

    /// Strategy catalog name (optional when --profile names one)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Strategy parameter binding, repeatable: -P key=value
    #[arg(short = 'P', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Load a saved profile first; explicit flags override it
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long)]
    pub max_bets: Option<u64>,

    #[arg(long)]
    pub max_losses: Option<u64>,

    #[arg(long)]
    pub max_wins: Option<u64>,

    /// Stop when session P/L falls to this (usually negative)
    #[arg(long, allow_hyphen_values = true)]
    pub stop_loss: Option<Decimal>,

    /// Stop when session P/L reaches this
    #[arg(long)]
    pub take_profit: Option<Decimal>,

    #[arg(long)]
    pub currency: Option<String>,

    /// Simulator RNG seed; ignored in live modes
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulator starting balance
    #[arg(long)]
    pub balance: Option<Decimal>,
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("'{raw}' is not of the form key=value"))
}

pub async fn execute(mut args: RunArgs) -> Result<ExitCode> {
    let config = AppConfig::load()?;

    if let Some(profile_name) = args.profile.clone() {
        let store = ProfileStore::open(&config_dir());
        let Some(profile) = store.load(&profile_name)? else {
            eprintln!("no profile named '{profile_name}'");
            return Ok(ExitCode::from(1));
        };
        apply_profile(&mut args, &profile);
    }

    let mode: SessionMode = match args.mode.parse() {
        Ok(mode) => mode,
        Err(_) => {
            eprintln!(
                "unknown mode '{}': expected simulation, live-main or live-faucet",
                args.mode
            );
            return Ok(ExitCode::from(1));
        }
    };
    let currency = Currency::new(args.currency.as_deref().unwrap_or(&config.currency));

    // Resolve the strategy and check the parameters before touching any
    // state: a bad parameter means no session starts.
    let Some(strategy_name) = args.strategy.clone() else {
        eprintln!("--strategy is required (or --profile naming one)");
        return Ok(ExitCode::from(1));
    };
    let Some(strategy) = dicebot_strategies::build(&strategy_name) else {
        eprintln!(
            "unknown strategy '{strategy_name}'; run `dicebot strategies` for the catalog"
        );
        return Ok(ExitCode::from(1));
    };
    let schema = strategy.metadata().params;
    let raw: HashMap<String, String> = args.params.iter().cloned().collect();
    let params = match Params::parse(&schema, &raw) {
        Ok(params) => params,
        Err(e @ StrategyError::BadParameter { .. }) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(1));
        }
    };

    // Pick the clock and the API for the requested mode.
    let (api, clock): (Arc<dyn DiceApi>, Arc<dyn Clock>) = match mode {
        SessionMode::Simulation => {
            let clock: Arc<dyn Clock> = Arc::new(VirtualClock::new());
            let mut sim = SimulatorConfig::new(
                args.seed.unwrap_or(0),
                args.balance.unwrap_or(dec!(100)),
                currency.clone(),
            );
            sim.house_edge = config.house_edge;
            // A modest simulated faucet so faucet strategies are testable.
            sim.faucet = Some((config.min_bet * dec!(100), Duration::from_secs(600)));
            (Arc::new(DiceSimulator::new(sim, clock.clone())), clock)
        }
        SessionMode::LiveMain | SessionMode::LiveFaucet => {
            let key = match api_key() {
                Ok(key) => key,
                Err(e) => {
                    eprintln!("{e:#}");
                    return Ok(ExitCode::from(2));
                }
            };
            let client = LiveDiceClient::with_base_url(key, config.api_base_url.clone())
                .map_err(|e| anyhow!("building API client: {e}"))?;
            (Arc::new(client), Arc::new(SystemClock::new()))
        }
    };

    // The index is best-effort: losing it never blocks a session.
    let repository = match connect(&history_db_path()).await {
        Ok(pool) => Some(SessionRepository::new(pool)),
        Err(e) => {
            warn!("🗄️ Session index unavailable, journals only: {e:#}");
            None
        }
    };

    let engine_config = EngineConfig {
        session_id: None,
        mode,
        currency,
        strategy_name: strategy_name.clone(),
        params_json: serde_json::json!(raw),
        stop: StopConditions {
            max_bets: args.max_bets,
            max_losses: args.max_losses,
            max_wins: args.max_wins,
            stop_loss: args.stop_loss,
            take_profit: args.take_profit,
        },
        min_bet: config.min_bet,
        min_profit: config.min_profit,
        house_edge: config.house_edge,
        chance_ceiling: config.chance_ceiling,
        tick_delay: Duration::from_millis(config.tick_delay_ms),
        turbo: config.turbo_mode || mode == SessionMode::Simulation,
        max_retries: config.max_retries,
        retry_pause_cap: Duration::from_millis(config.retry_pause_cap_ms),
        journal_dir: journal_dir(),
    };

    let (handle, control) = control_channel();
    let ctrl_c_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_handle.stop();
        }
    });

    let engine = AutoBetEngine::new(api, clock, engine_config, repository, control);
    let summary = match engine.run(strategy, &params).await {
        Ok(summary) => summary,
        Err(BotError::Strategy(e)) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(1));
        }
        Err(BotError::Api(e)) => {
            eprintln!("api failure: {e}");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    print_summary(&summary);
    print_metrics(&summary);

    Ok(match summary.stop_reason {
        StopReason::Bankrupt { .. } => ExitCode::from(3),
        StopReason::Api { .. } => ExitCode::from(2),
        _ => ExitCode::SUCCESS,
    })
}

fn apply_profile(args: &mut RunArgs, profile: &dicebot_models::Profile) {
    if args.strategy.is_none() {
        args.strategy = Some(profile.strategy.clone());
    }
    let explicit: Vec<String> = args.params.iter().map(|(k, _)| k.clone()).collect();
    for (key, value) in &profile.params {
        if !explicit.contains(key) {
            args.params.push((key.clone(), value.clone()));
        }
    }
    // "simulation" is the flag default, so only an explicit non-default
    // --mode outranks the profile.
    if args.mode == "simulation" {
        args.mode = profile.mode.to_string();
    }
    if args.currency.is_none() {
        args.currency = Some(profile.currency.to_string());
    }
    args.max_bets = args.max_bets.or(profile.stop.max_bets);
    args.max_losses = args.max_losses.or(profile.stop.max_losses);
    args.max_wins = args.max_wins.or(profile.stop.max_wins);
    args.stop_loss = args.stop_loss.or(profile.stop.stop_loss);
    args.take_profit = args.take_profit.or(profile.stop.take_profit);
    args.seed = args.seed.or(profile.seed);
}

fn print_summary(summary: &SessionSummary) {
    println!("\nsession {}", summary.session_id);
    println!("  stop reason:   {}", summary.stop_reason);
    println!("  bets:          {} ({} won, {} lost)", summary.bets, summary.wins, summary.losses);
    println!("  balance:       {} -> {}", money::format_amount(summary.starting_balance), money::format_amount(summary.ending_balance));
    println!("  profit:        {}", money::format_amount(summary.profit));
    println!("  wagered:       {}", money::format_amount(summary.total_wagered));
    println!("  streaks:       +{} / -{}", summary.max_win_streak, summary.max_loss_streak);
    println!("  duration:      {:.1?}", summary.duration);
}

fn print_metrics(summary: &SessionSummary) {
    let path = journal_dir().join(format!("{}.jsonl", summary.session_id));
    let bets = match journal_bets(&path) {
        Ok(bets) if !bets.is_empty() => bets,
        _ => return,
    };
    let mut acc = MetricsAccumulator::new();
    bets.iter().for_each(|b| acc.record(b));
    let perf = acc.performance();
    let risk = acc.risk(summary.starting_balance);

    println!("  win rate:      {:.2}%", perf.win_rate * 100.0);
    println!("  roi:           {:.3}%", perf.roi * 100.0);
    println!("  avg stake:     {}", money::format_amount(perf.average_stake));
    println!("  max drawdown:  {} ({:.1}%)", money::format_amount(risk.max_drawdown), risk.max_drawdown_pct * 100.0);
    println!("  risk of ruin:  {:.4}", risk.risk_of_ruin);
    println!("  bankroll hint: {}", money::format_amount(risk.suggested_bankroll));
}
