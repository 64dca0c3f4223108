use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

const MAX_FIB_INDEX: usize = 40;

fn fib_table() -> Vec<Decimal> {
    let mut table = Vec::with_capacity(MAX_FIB_INDEX + 1);
    let (mut a, mut b) = (Decimal::ONE, Decimal::ONE);
    for _ in 0..=MAX_FIB_INDEX {
        table.push(a);
        let next = a + b;
        a = b;
        b = next;
    }
    table
}

/// Walks the Fibonacci sequence: one step forward on a loss, two steps back
/// on a win (never below the start). Gentler than martingale, still a loss
/// progression.
#[derive(Debug)]
pub struct Fibonacci {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    index: usize,
    table: Vec<Decimal>,
}

impl Fibonacci {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            index: 0,
            table: fib_table(),
        })
    }
}

impl Strategy for Fibonacci {
    fn name(&self) -> &'static str {
        "fibonacci"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "fibonacci",
            summary: "Stake follows the Fibonacci sequence: +1 step on loss, -2 on win.",
            risk_level: RiskLevel::High,
            bankroll_hint: "sum of the first ~15 Fibonacci numbers x base",
            volatility: "high during losing runs, but growth is sub-martingale",
            time_to_profit: "moderate; two wins claw back three losses",
            recommended_audience: "progression players wanting slower escalation",
            pros: &[
                "Stake grows far slower than doubling",
                "Two-step retreat banks progress after each win",
            ],
            cons: &["Long losing runs still reach painful stakes"],
            tips: &["Watch the index, not the stake: deep indices mean deep drawdown"],
            params: vec![base_param(dec!(0.00000001)), chance_param(), side_param()],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.index = 0;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        let stake = self.base * self.table[self.index.min(MAX_FIB_INDEX)];
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.index = self.index.saturating_sub(2);
        } else {
            self.index = (self.index + 1).min(MAX_FIB_INDEX);
        }
    }
}

/// Fibonacci variant that only advances when losses *cluster*: the index
/// moves forward only if the sliding window already holds enough losses.
/// Scattered losses stay at the current rung.
#[derive(Debug)]
pub struct FibLossCluster {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    window: usize,
    cluster: u64,
    index: usize,
    table: Vec<Decimal>,
}

impl FibLossCluster {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            window: 10,
            cluster: 3,
            index: 0,
            table: fib_table(),
        })
    }

    fn losses_in_window(&self, ctx: &StrategyContext) -> u64 {
        ctx.history
            .iter()
            .rev()
            .take(self.window)
            .filter(|r| !r.won)
            .count() as u64
    }
}

impl Strategy for FibLossCluster {
    fn name(&self) -> &'static str {
        "fib-loss-cluster"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "fib-loss-cluster",
            summary: "Fibonacci that only escalates when losses bunch together.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "similar to fibonacci but escalates far less often",
            volatility: "medium",
            time_to_profit: "slow; most ticks behave like flat betting",
            recommended_audience: "progression players who distrust scattered variance",
            pros: &[
                "Ignores isolated losses entirely",
                "Escalation needs sustained evidence of a cold run",
            ],
            cons: &["Late to escalate, so recovery after real runs is slower"],
            tips: &["Tighten cluster/window to react faster, loosen to react less"],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::integer("window", 10, Some(2), Some(200), "Sliding window size in bets"),
                ParamSpec::integer(
                    "cluster",
                    3,
                    Some(1),
                    Some(200),
                    "Losses within the window required before the index advances",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.window = params.integer("window")? as usize;
        let cluster = params.integer("cluster")?;
        if cluster > self.window as i64 {
            return Err(StrategyError::bad_parameter(
                "cluster",
                "cannot exceed window",
            ));
        }
        self.cluster = cluster as u64;
        self.index = 0;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        let stake = self.base * self.table[self.index.min(MAX_FIB_INDEX)];
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.index = self.index.saturating_sub(2);
        } else if self.losses_in_window(ctx) >= self.cluster {
            self.index = (self.index + 1).min(MAX_FIB_INDEX);
        }
    }

    fn history_window(&self) -> usize {
        self.window.max(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::Currency;
    use std::collections::HashMap;

    fn ctx(history: usize) -> StrategyContext {
        StrategyContext::new(
            Currency::new("btc"),
            dec!(0.03),
            dec!(100),
            history,
            Utc::now(),
        )
    }

    fn init_default(strategy: &mut dyn Strategy) {
        let schema = strategy.metadata().params;
        let mut raw = HashMap::new();
        raw.insert("base".to_string(), "1".to_string());
        let params = Params::parse(&schema, &raw).unwrap();
        strategy.init(&params, &ctx(10)).unwrap();
    }

    fn outcome(won: bool, stake: Decimal) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(stake, dec!(49.5), BetSide::High),
            roll: dec!(0),
            won,
            profit: if won { stake } else { -stake },
            balance_after: dec!(100),
            fairness: None,
        }
    }

    fn stake_of(action: Action) -> Decimal {
        match action {
            Action::Bet(spec) => spec.amount,
            other => panic!("expected a bet, got {other:?}"),
        }
    }

    #[test]
    fn walks_the_sequence() {
        let mut s = Fibonacci::boxed();
        init_default(s.as_mut());
        let mut c = ctx(10);

        // 1, 1, 2, 3, 5 on consecutive losses
        let expected = [dec!(1), dec!(1), dec!(2), dec!(3), dec!(5)];
        for want in expected {
            assert_eq!(stake_of(s.next_bet(&c)), want);
            let r = outcome(false, want);
            c.record(&r);
            s.on_result(&c, &r);
        }
        // A win walks two steps back: from index 5 (stake 8) to index 3 (stake 3)
        let r = outcome(true, dec!(8));
        c.record(&r);
        s.on_result(&c, &r);
        assert_eq!(stake_of(s.next_bet(&c)), dec!(3));
    }

    #[test]
    fn cluster_variant_ignores_scattered_losses() {
        let mut s = FibLossCluster::boxed();
        init_default(s.as_mut());
        let mut c = ctx(10);

        // Alternate win/loss: the window never accumulates 3 losses in 10
        // until late, and wins keep pulling the index back anyway.
        for i in 0..4 {
            let won = i % 2 == 0;
            let r = outcome(won, dec!(1));
            c.record(&r);
            s.on_result(&c, &r);
        }
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));

        // Three straight losses cross the cluster threshold and escalate.
        for _ in 0..3 {
            let r = outcome(false, dec!(1));
            c.record(&r);
            s.on_result(&c, &r);
        }
        assert!(stake_of(s.next_bet(&c)) > dec!(1));
    }
}
