use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Cancellation system: keep a list of units summing to the target profit,
/// stake the first plus the last, cross both off on a win, append the lost
/// stake on a loss. An empty list means the target was collected.
#[derive(Debug)]
pub struct Labouchere {
    unit: Decimal,
    chance: Decimal,
    side: BetSide,
    target_units: i64,
    line: Vec<i64>,
}

impl Labouchere {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            unit: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            target_units: 10,
            line: Vec::new(),
        })
    }

    /// Decompose the target into an ascending line `1, 2, ..., k (+rest)`.
    fn build_line(target_units: i64) -> Vec<i64> {
        let mut line = Vec::new();
        let mut remaining = target_units;
        let mut step = 1;
        while remaining > 0 {
            let chunk = step.min(remaining);
            line.push(chunk);
            remaining -= chunk;
            step += 1;
        }
        line
    }

    fn stake_units(&self) -> i64 {
        match self.line.len() {
            0 => 0,
            1 => self.line[0],
            _ => self.line[0] + self.line[self.line.len() - 1],
        }
    }
}

impl Strategy for Labouchere {
    fn name(&self) -> &'static str {
        "labouchere"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "labouchere",
            summary: "Cancellation line: stake first+last units, cross them off on a win.",
            risk_level: RiskLevel::High,
            bankroll_hint: "several times the line total; losses lengthen the line",
            volatility: "high; the line can snowball after a cold start",
            time_to_profit: "bounded if wins keep coming: each win removes two entries",
            recommended_audience: "players who want an explicit profit target",
            pros: &[
                "Terminates with exactly the target profit when the line empties",
                "Wins only need to outnumber one third of losses",
            ],
            cons: &["Every loss appends a bigger number than it crossed off"],
            tips: &["Smaller target lines finish far more often than ambitious ones"],
            params: vec![
                ParamSpec::decimal(
                    "unit",
                    dec!(0.00000001),
                    Some(Decimal::ZERO),
                    None,
                    "Currency value of one line unit",
                ),
                ParamSpec::integer(
                    "target",
                    10,
                    Some(1),
                    Some(10_000),
                    "Profit target in line units",
                ),
                chance_param(),
                side_param(),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.unit = params.decimal("unit")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.target_units = params.integer("target")?;
        self.line = Self::build_line(self.target_units);
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        if self.line.is_empty() {
            return Action::Stop(format!(
                "line complete, target of {} units collected",
                self.target_units
            ));
        }
        let stake = Decimal::from(self.stake_units()) * self.unit;
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if self.line.is_empty() {
            return;
        }
        if result.won {
            self.line.remove(0);
            if !self.line.is_empty() {
                self.line.pop();
            }
        } else {
            self.line.push(self.stake_units());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::Currency;
    use std::collections::HashMap;

    fn ctx() -> StrategyContext {
        StrategyContext::new(Currency::new("btc"), dec!(0.03), dec!(100), 0, Utc::now())
    }

    fn outcome(won: bool) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(49.5), BetSide::High),
            roll: dec!(0),
            won,
            profit: dec!(0),
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

    fn init_target(s: &mut dyn Strategy, target: &str) {
        let schema = s.metadata().params;
        let mut raw = HashMap::new();
        raw.insert("unit".to_string(), "1".to_string());
        raw.insert("target".to_string(), target.to_string());
        let params = Params::parse(&schema, &raw).unwrap();
        s.init(&params, &ctx()).unwrap();
    }

    #[test]
    fn line_decomposition_sums_to_target() {
        assert_eq!(Labouchere::build_line(10), vec![1, 2, 3, 4]);
        assert_eq!(Labouchere::build_line(5), vec![1, 2, 2]);
        assert_eq!(Labouchere::build_line(1), vec![1]);
    }

    #[test]
    fn win_pops_both_ends_loss_appends_stake() {
        let mut s = Labouchere::boxed();
        init_target(s.as_mut(), "10");
        let c = ctx();

        // Line 1,2,3,4 -> stake 1+4 = 5
        assert_eq!(stake_of(s.next_bet(&c)), dec!(5));
        s.on_result(&c, &outcome(false));
        // Line 1,2,3,4,5 -> stake 1+5 = 6
        assert_eq!(stake_of(s.next_bet(&c)), dec!(6));
        s.on_result(&c, &outcome(true));
        // Line 2,3,4 -> stake 2+4 = 6
        assert_eq!(stake_of(s.next_bet(&c)), dec!(6));
    }

    #[test]
    fn empty_line_stops_the_session() {
        let mut s = Labouchere::boxed();
        init_target(s.as_mut(), "1");
        let c = ctx();

        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        s.on_result(&c, &outcome(true));
        assert!(matches!(s.next_bet(&c), Action::Stop(_)));
    }
}
