use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    money, BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext,
    StrategyError, StrategyMetadata,
};

use crate::common::{chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Wagers a constant fraction of the current balance, escalating the
/// fraction after every N straight wins and falling back to the starting
/// fraction on any loss.
#[derive(Debug)]
pub struct MaxWagerFlow {
    initial_fraction: Decimal,
    fraction: Decimal,
    chance: Decimal,
    side: BetSide,
    escalate_after: i64,
    escalate_factor: Decimal,
    max_fraction: Decimal,
    wins_since_escalation: i64,
}

impl MaxWagerFlow {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            initial_fraction: dec!(0.01),
            fraction: dec!(0.01),
            chance: dec!(49.5),
            side: BetSide::High,
            escalate_after: 5,
            escalate_factor: dec!(1.5),
            max_fraction: dec!(0.1),
            wins_since_escalation: 0,
        })
    }
}

impl Strategy for MaxWagerFlow {
    fn name(&self) -> &'static str {
        "max-wager-flow"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "max-wager-flow",
            summary: "Stakes a balance fraction, raising the fraction after win runs.",
            risk_level: RiskLevel::High,
            bankroll_hint: "self-scaling, but the escalated fraction bites hard",
            volatility: "high once escalated",
            time_to_profit: "compounds quickly during streaks",
            recommended_audience: "volume players chasing wagering targets",
            pros: &[
                "Stakes scale down automatically as the balance shrinks",
                "Win runs compound the balance geometrically",
            ],
            cons: &["An escalated loss costs a large slice of the balance"],
            tips: &["max_fraction is the difference between a dip and a crater"],
            params: vec![
                ParamSpec::decimal(
                    "fraction",
                    dec!(0.01),
                    Some(dec!(0.0001)),
                    Some(dec!(1)),
                    "Starting fraction of balance wagered per bet",
                ),
                chance_param(),
                side_param(),
                ParamSpec::integer(
                    "escalate_after",
                    5,
                    Some(1),
                    Some(100),
                    "Consecutive wins required before the fraction escalates",
                ),
                ParamSpec::decimal(
                    "escalate_factor",
                    dec!(1.5),
                    Some(dec!(1)),
                    Some(dec!(10)),
                    "Multiplier applied to the fraction on escalation",
                ),
                ParamSpec::decimal(
                    "max_fraction",
                    dec!(0.1),
                    Some(dec!(0.001)),
                    Some(dec!(1)),
                    "Ceiling for the escalated fraction",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.initial_fraction = params.decimal("fraction")?;
        self.fraction = self.initial_fraction;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.escalate_after = params.integer("escalate_after")?;
        self.escalate_factor = params.decimal("escalate_factor")?;
        self.max_fraction = params.decimal("max_fraction")?;
        if self.max_fraction < self.initial_fraction {
            return Err(StrategyError::bad_parameter(
                "max_fraction",
                "must be at least the starting fraction",
            ));
        }
        self.wins_since_escalation = 0;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        let stake = money::round_down(ctx.balance * self.fraction);
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.wins_since_escalation += 1;
            if self.wins_since_escalation >= self.escalate_after {
                self.fraction = (self.fraction * self.escalate_factor).min(self.max_fraction);
                self.wins_since_escalation = 0;
            }
        } else {
            self.fraction = self.initial_fraction;
            self.wins_since_escalation = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::Currency;
    use std::collections::HashMap;

    fn ctx(balance: Decimal) -> StrategyContext {
        StrategyContext::new(Currency::new("btc"), dec!(0.03), balance, 0, Utc::now())
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
    fn fraction_escalates_after_run_and_resets_on_loss() {
        let mut s = MaxWagerFlow::boxed();
        let schema = s.metadata().params;
        let raw: HashMap<String, String> = [
            ("fraction", "0.01"),
            ("escalate_after", "2"),
            ("escalate_factor", "2"),
            ("max_fraction", "0.03"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let params = Params::parse(&schema, &raw).unwrap();
        s.init(&params, &ctx(dec!(100))).unwrap();
        let c = ctx(dec!(100));

        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        s.on_result(&c, &outcome(true));
        s.on_result(&c, &outcome(true));
        // Two straight wins double the fraction: 1% -> 2%.
        assert_eq!(stake_of(s.next_bet(&c)), dec!(2));
        s.on_result(&c, &outcome(true));
        s.on_result(&c, &outcome(true));
        // Next escalation clamps at max_fraction 3%.
        assert_eq!(stake_of(s.next_bet(&c)), dec!(3));
        s.on_result(&c, &outcome(false));
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
    }
}
