use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

const SEQUENCE: [u32; 4] = [1, 3, 2, 6];

/// Fixed 1-3-2-6 positive progression: advance a step on each win, reset
/// on any loss or after completing the fourth step.
#[derive(Debug)]
pub struct OneThreeTwoSix {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    step: usize,
}

impl OneThreeTwoSix {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            step: 0,
        })
    }
}

impl Strategy for OneThreeTwoSix {
    fn name(&self) -> &'static str {
        "one-three-two-six"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "one-three-two-six",
            summary: "The 1-3-2-6 ladder: four-step win progression, reset on loss.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "30x base covers many consecutive failed ladders",
            volatility: "medium",
            time_to_profit: "a completed ladder banks 12 base bets",
            recommended_audience: "players wanting structure without open-ended doubling",
            pros: &[
                "Worst case per ladder is two base bets",
                "Profit is locked after the second step",
            ],
            cons: &["Full ladders are rare at even-money chances"],
            tips: &["Treat each completed ladder as a natural pause point"],
            params: vec![base_param(dec!(0.00000001)), chance_param(), side_param()],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.step = 0;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        let stake = self.base * Decimal::from(SEQUENCE[self.step]);
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.step += 1;
            if self.step == SEQUENCE.len() {
                self.step = 0;
            }
        } else {
            self.step = 0;
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

    #[test]
    fn ladder_walks_1_3_2_6_then_resets() {
        let mut s = OneThreeTwoSix::boxed();
        let schema = s.metadata().params;
        let mut raw = HashMap::new();
        raw.insert("base".to_string(), "1".to_string());
        let params = Params::parse(&schema, &raw).unwrap();
        s.init(&params, &ctx()).unwrap();
        let c = ctx();

        for want in [dec!(1), dec!(3), dec!(2), dec!(6)] {
            assert_eq!(stake_of(s.next_bet(&c)), want);
            s.on_result(&c, &outcome(true));
        }
        // Completed ladder resets to step one.
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        s.on_result(&c, &outcome(true));
        s.on_result(&c, &outcome(false));
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
    }
}
