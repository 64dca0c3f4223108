//! The full-catalog comparison sweep, as a user would run it.

use rust_decimal_macros::dec;

use dicebot_services::{render_html, run_comparison, CompareConfig};
use dicebot_strategies::catalog;

#[tokio::test]
async fn full_sweep_terminates_and_reports_sanely() {
    let report = run_comparison(CompareConfig::new(dec!(10), 2000, 42)).await;

    // Exactly the declared skips, everything else ran.
    let skipped: Vec<&str> = report.skipped.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(skipped, vec!["faucet-grind", "faucet-cashout"]);
    assert_eq!(report.outcomes.len(), catalog().len() - skipped.len());

    for outcome in &report.outcomes {
        assert!(
            outcome.summary.is_some() || outcome.error.is_some(),
            "{} neither finished nor failed",
            outcome.name
        );
    }

    // Nobody beats the house edge beyond statistical noise.
    for outcome in &report.outcomes {
        if let Some(perf) = &outcome.performance {
            if perf.total_bets >= 100 {
                let noise = 3.0 / (perf.total_bets as f64).sqrt();
                assert!(
                    perf.roi < 0.03 + noise,
                    "{} shows ROI {:.4} over {} bets",
                    outcome.name,
                    perf.roi,
                    perf.total_bets
                );
            }
        }
    }

    // With 1%-of-bankroll base stakes over 2000 bets, at least one of the
    // aggressive progressions runs its bankroll into the ground.
    assert!(
        report.outcomes.iter().any(|o| o.busted),
        "no strategy busted over the sweep"
    );

    // The report itself: self-contained, covers every row.
    let html = render_html(&report);
    assert!(html.starts_with("<!DOCTYPE html>"));
    for outcome in &report.outcomes {
        assert!(html.contains(&outcome.name), "missing row for {}", outcome.name);
    }
    for (name, _) in &report.skipped {
        assert!(html.contains(name), "missing skip entry for {name}");
    }
    assert!(!html.contains("http://"));
    assert!(!html.contains("https://"));
}
