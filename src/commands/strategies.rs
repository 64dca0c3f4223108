use anyhow::Result;
use std::process::ExitCode;

use dicebot_strategies::catalog;

/// `strategies`: one line per catalog entry.
pub fn list() -> Result<ExitCode> {
    println!("{:<24} {:<10} summary", "strategy", "risk");
    println!("{}", "-".repeat(78));
    for entry in catalog() {
        let strategy = (entry.build)();
        let meta = strategy.metadata();
        println!(
            "{:<24} {} {:<7} {}",
            meta.name,
            meta.risk_level.emoji(),
            meta.risk_level,
            meta.summary
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// `show <strategy>`: the full metadata card.
pub fn show(name: &str) -> Result<ExitCode> {
    let Some(strategy) = dicebot_strategies::build(name) else {
        eprintln!("unknown strategy '{name}'; run `dicebot strategies` for the catalog");
        return Ok(ExitCode::from(1));
    };
    let meta = strategy.metadata();

    println!("{} {}: {}", meta.risk_level.emoji(), meta.name, meta.summary);
    println!();
    println!("risk:       {}", meta.risk_level);
    println!("bankroll:   {}", meta.bankroll_hint);
    println!("volatility: {}", meta.volatility);
    println!("horizon:    {}", meta.time_to_profit);
    println!("audience:   {}", meta.recommended_audience);

    println!("\nparameters:");
    for param in &meta.params {
        let range = match (param.min, param.max) {
            (Some(min), Some(max)) => format!(" [{min}..{max}]"),
            (Some(min), None) => format!(" [>= {min}]"),
            (None, Some(max)) => format!(" [<= {max}]"),
            (None, None) => String::new(),
        };
        println!(
            "  -P {}=<{:?}>{} (default {})",
            param.name, param.kind, range, param.default
        );
        println!("      {}", param.description);
    }

    if !meta.pros.is_empty() {
        println!("\npros:");
        for p in meta.pros {
            println!("  + {p}");
        }
    }
    if !meta.cons.is_empty() {
        println!("\ncons:");
        for c in meta.cons {
            println!("  - {c}");
        }
    }
    if !meta.tips.is_empty() {
        println!("\ntips:");
        for t in meta.tips {
            println!("  * {t}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
