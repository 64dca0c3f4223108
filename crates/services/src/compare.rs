use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use dicebot_db::journal_bets;
use dicebot_models::{
    money, Currency, Params, SessionMode, SessionSummary, StopConditions,
};
use dicebot_strategies::catalog;

use crate::clock::VirtualClock;
use crate::engine::{control_channel, AutoBetEngine, EngineConfig};
use crate::metrics::{MetricsAccumulator, PerformanceReport, RiskReport};
use crate::simulator::{DiceSimulator, SimulatorConfig};

/// Shared configuration for one comparison sweep: every strategy gets the
/// same starting balance, bet budget and RNG seed.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub starting_balance: Decimal,
    pub max_bets: u64,
    pub seed: u64,
    pub house_edge: Decimal,
    pub currency: Currency,
    pub min_bet: Decimal,
}

impl CompareConfig {
    pub fn new(starting_balance: Decimal, max_bets: u64, seed: u64) -> Self {
        Self {
            starting_balance,
            max_bets,
            seed,
            house_edge: dec!(0.03),
            currency: Currency::new("btc"),
            min_bet: dec!(0.00000001),
        }
    }
}

/// One strategy's run in the sweep.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub name: String,
    pub risk_emoji: &'static str,
    pub summary: Option<SessionSummary>,
    pub performance: Option<PerformanceReport>,
    pub risk: Option<RiskReport>,
    pub error: Option<String>,
    pub busted: bool,
}

#[derive(Debug)]
pub struct CompareReport {
    pub config: CompareConfig,
    pub outcomes: Vec<StrategyOutcome>,
    pub skipped: Vec<(String, String)>,
}

/// Strategies that cannot run under plain simulation, with the reason the
/// report shows for them.
fn skip_reason(name: &str) -> Option<&'static str> {
    match name {
        "faucet-grind" | "faucet-cashout" => {
            Some("requires a faucet wallet, which the comparison simulator does not provide")
        }
        _ => None,
    }
}

/// Run the whole catalog against identically-configured simulators. A
/// strategy failing is recorded in its row; it never aborts the sweep.
pub async fn run_comparison(config: CompareConfig) -> CompareReport {
    let journal_root = std::env::temp_dir()
        .join("dicebot-compare")
        .join(Uuid::new_v4().to_string());
    let mut outcomes = Vec::new();
    let mut skipped = Vec::new();

    for entry in catalog() {
        if let Some(reason) = skip_reason(entry.name) {
            info!("⏭️ Skipping {}: {reason}", entry.name);
            skipped.push((entry.name.to_string(), reason.to_string()));
            continue;
        }
        info!("🏇 Comparing {}", entry.name);
        let outcome = run_one(&config, entry.name, &journal_root).await;
        if let Some(error) = &outcome.error {
            warn!("💥 {} failed: {error}", entry.name);
        }
        outcomes.push(outcome);
    }

    CompareReport {
        config,
        outcomes,
        skipped,
    }
}

async fn run_one(config: &CompareConfig, name: &str, journal_root: &Path) -> StrategyOutcome {
    let Some(strategy) = dicebot_strategies::build(name) else {
        return StrategyOutcome {
            name: name.to_string(),
            risk_emoji: "",
            summary: None,
            performance: None,
            risk: None,
            error: Some("unknown strategy".to_string()),
            busted: false,
        };
    };
    let metadata = strategy.metadata();
    let risk_emoji = metadata.risk_level.emoji();

    // Base stakes in the catalog default to satoshi-level play; scale them
    // to 1% of the shared bankroll so every progression actually moves it.
    let share = money::round_down(config.starting_balance / dec!(100)).max(money::min_unit());
    let mut raw = HashMap::new();
    for spec in &metadata.params {
        if spec.name == "base" || spec.name == "unit" {
            raw.insert(spec.name.to_string(), share.to_string());
        }
    }
    let params = match Params::parse(&metadata.params, &raw) {
        Ok(params) => params,
        Err(e) => {
            return StrategyOutcome {
                name: name.to_string(),
                risk_emoji,
                summary: None,
                performance: None,
                risk: None,
                error: Some(e.to_string()),
                busted: false,
            }
        }
    };

    let clock = Arc::new(VirtualClock::new());
    let mut sim_config = SimulatorConfig::new(
        config.seed,
        config.starting_balance,
        config.currency.clone(),
    );
    sim_config.house_edge = config.house_edge;
    let api = Arc::new(DiceSimulator::new(sim_config, clock.clone()));

    let session_id = Uuid::new_v4();
    let engine_config = EngineConfig {
        session_id: Some(session_id),
        mode: SessionMode::Simulation,
        currency: config.currency.clone(),
        strategy_name: name.to_string(),
        params_json: serde_json::json!(raw),
        stop: StopConditions {
            max_bets: Some(config.max_bets),
            ..StopConditions::default()
        },
        min_bet: config.min_bet,
        min_profit: Decimal::ZERO,
        house_edge: config.house_edge,
        chance_ceiling: dec!(98),
        tick_delay: Duration::ZERO,
        turbo: true,
        max_retries: 0,
        retry_pause_cap: Duration::from_secs(5),
        journal_dir: journal_root.to_path_buf(),
    };

    let (_handle, control) = control_channel();
    let engine = AutoBetEngine::new(api, clock, engine_config, None, control);

    match engine.run(strategy, &params).await {
        Ok(summary) => {
            let journal_path = journal_root.join(format!("{session_id}.jsonl"));
            let (performance, risk) = match journal_bets(&journal_path) {
                Ok(bets) => {
                    let mut acc = MetricsAccumulator::new();
                    bets.iter().for_each(|b| acc.record(b));
                    (
                        Some(acc.performance()),
                        Some(acc.risk(config.starting_balance)),
                    )
                }
                Err(e) => {
                    warn!("📄 Could not read back journal for {name}: {e}");
                    (None, None)
                }
            };
            let busted = summary.ending_balance < config.min_bet;
            StrategyOutcome {
                name: name.to_string(),
                risk_emoji,
                summary: Some(summary),
                performance,
                risk,
                error: None,
                busted,
            }
        }
        Err(e) => StrategyOutcome {
            name: name.to_string(),
            risk_emoji,
            summary: None,
            performance: None,
            risk: None,
            error: Some(e.to_string()),
            busted: false,
        },
    }
}

/// Render the sweep as a single self-contained HTML page: inline styles,
/// no external assets.
pub fn render_html(report: &CompareReport) -> String {
    let mut rows = String::new();
    for outcome in &report.outcomes {
        let (bets, win_rate, profit, roi, drawdown, stop, status) = match (
            &outcome.summary,
            &outcome.performance,
            &outcome.risk,
        ) {
            (Some(summary), Some(perf), Some(risk)) => (
                summary.bets.to_string(),
                format!("{:.1}%", perf.win_rate * 100.0),
                money::format_amount(summary.profit),
                format!("{:.2}%", perf.roi * 100.0),
                money::format_amount(risk.max_drawdown),
                summary.stop_reason.to_string(),
                if outcome.busted { "💀 busted" } else { "ok" }.to_string(),
            ),
            _ => (
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                format!("error: {}", outcome.error.as_deref().unwrap_or("unknown")),
            ),
        };
        rows.push_str(&format!(
            "<tr><td>{} {}</td><td>{bets}</td><td>{win_rate}</td>\
             <td class=\"num\">{profit}</td><td>{roi}</td><td class=\"num\">{drawdown}</td>\
             <td>{stop}</td><td>{status}</td></tr>\n",
            outcome.risk_emoji, outcome.name
        ));
    }

    let mut skipped = String::new();
    for (name, reason) in &report.skipped {
        skipped.push_str(&format!("<li><b>{name}</b>: {reason}</li>\n"));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Strategy comparison</title>
<style>
body {{ font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 2rem; color: #222; }}
h1 {{ font-size: 1.4rem; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }}
th {{ background: #f2f2f2; }}
td.num {{ font-variant-numeric: tabular-nums; text-align: right; }}
tr:nth-child(even) {{ background: #fafafa; }}
.meta {{ color: #666; margin-bottom: 1rem; }}
</style>
</head>
<body>
<h1>Strategy comparison</h1>
<p class="meta">balance {balance} {currency} · max {max_bets} bets · seed {seed} · house edge {edge}</p>
<table>
<thead><tr><th>Strategy</th><th>Bets</th><th>Win rate</th><th>Profit</th><th>ROI</th><th>Max drawdown</th><th>Stop reason</th><th>Status</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
<h2>Skipped</h2>
<ul>
{skipped}</ul>
</body>
</html>
"#,
        balance = money::format_amount(report.config.starting_balance),
        currency = report.config.currency,
        max_bets = report.config.max_bets,
        seed = report.config.seed,
        edge = report.config.house_edge,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_covers_the_catalog_and_declares_skips() {
        let report = run_comparison(CompareConfig::new(dec!(10), 50, 42)).await;

        let expected = catalog().len() - report.skipped.len();
        assert_eq!(report.outcomes.len(), expected);
        assert!(report
            .skipped
            .iter()
            .any(|(name, _)| name == "faucet-grind"));
        assert!(report
            .skipped
            .iter()
            .any(|(name, _)| name == "faucet-cashout"));

        // Every non-skipped strategy terminated one way or the other.
        for outcome in &report.outcomes {
            assert!(
                outcome.summary.is_some() || outcome.error.is_some(),
                "{} neither finished nor failed",
                outcome.name
            );
        }

        // Sanity: nobody beats the house edge beyond statistical noise.
        for outcome in &report.outcomes {
            if let Some(perf) = &outcome.performance {
                if perf.total_bets >= 50 {
                    let noise = 3.0 / (perf.total_bets as f64).sqrt();
                    assert!(
                        perf.roi < 0.03 + noise,
                        "{} shows ROI {} over {} bets",
                        outcome.name,
                        perf.roi,
                        perf.total_bets
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn html_report_is_self_contained() {
        let report = run_comparison(CompareConfig::new(dec!(1), 5, 1)).await;
        let html = render_html(&report);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("classic-martingale"));
        assert!(html.contains("Skipped"));
        assert!(!html.contains("http://"));
        assert!(!html.contains("src="));
    }
}
