//! Compile-time strategy registry. Each module exposes a `boxed()`
//! constructor; the catalog lists them in display order.

use crate::dalembert::DAlembert;
use crate::faucet::{FaucetCashout, FaucetGrind};
use crate::fibonacci::{FibLossCluster, Fibonacci};
use crate::flat::Flat;
use crate::kelly::KellyCapped;
use crate::labouchere::Labouchere;
use crate::martingale::{AntiMartingaleStreak, ClassicMartingale};
use crate::max_wager_flow::MaxWagerFlow;
use crate::micro_exponential::{MicroExponential, MicroExponentialSafe};
use crate::one_three_two_six::OneThreeTwoSix;
use crate::oscars_grind::OscarsGrind;
use crate::paroli::Paroli;
use crate::range_random::Range50Random;
use crate::rng_analysis::RngAnalysis;
use crate::streak_hunter::StreakHunter;
use crate::target_aware::TargetAware;
use crate::Strategy;

/// One catalog row: stable name plus a fresh-instance constructor.
pub struct CatalogEntry {
    pub name: &'static str,
    pub build: fn() -> Box<dyn Strategy>,
}

/// The full catalog, in display order. Names here are the identifiers the
/// CLI, profiles, and the session store use.
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry { name: "flat", build: Flat::boxed },
        CatalogEntry { name: "classic-martingale", build: ClassicMartingale::boxed },
        CatalogEntry { name: "anti-martingale-streak", build: AntiMartingaleStreak::boxed },
        CatalogEntry { name: "fibonacci", build: Fibonacci::boxed },
        CatalogEntry { name: "dalembert", build: DAlembert::boxed },
        CatalogEntry { name: "labouchere", build: Labouchere::boxed },
        CatalogEntry { name: "paroli", build: Paroli::boxed },
        CatalogEntry { name: "oscars-grind", build: OscarsGrind::boxed },
        CatalogEntry { name: "one-three-two-six", build: OneThreeTwoSix::boxed },
        CatalogEntry { name: "kelly-capped", build: KellyCapped::boxed },
        CatalogEntry { name: "streak-hunter", build: StreakHunter::boxed },
        CatalogEntry { name: "faucet-grind", build: FaucetGrind::boxed },
        CatalogEntry { name: "faucet-cashout", build: FaucetCashout::boxed },
        CatalogEntry { name: "target-aware", build: TargetAware::boxed },
        CatalogEntry { name: "range-50-random", build: Range50Random::boxed },
        CatalogEntry { name: "max-wager-flow", build: MaxWagerFlow::boxed },
        CatalogEntry { name: "fib-loss-cluster", build: FibLossCluster::boxed },
        CatalogEntry { name: "micro-exponential", build: MicroExponential::boxed },
        CatalogEntry { name: "micro-exponential-safe", build: MicroExponentialSafe::boxed },
        CatalogEntry { name: "rng-analysis", build: RngAnalysis::boxed },
    ]
}

/// Construct a fresh strategy instance by catalog name.
pub fn build(name: &str) -> Option<Box<dyn Strategy>> {
    catalog()
        .into_iter()
        .find(|entry| entry.name == name)
        .map(|entry| (entry.build)())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_match_instances() {
        let entries = catalog();
        let names: HashSet<&str> = entries.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), entries.len());
        for entry in &entries {
            let strategy = (entry.build)();
            assert_eq!(strategy.name(), entry.name);
            assert_eq!(strategy.metadata().name, entry.name);
        }
    }

    #[test]
    fn build_resolves_known_names_only() {
        assert!(build("classic-martingale").is_some());
        assert!(build("no-such-strategy").is_none());
    }
}
