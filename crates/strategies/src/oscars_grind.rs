use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Grind toward a small target: raise the stake by one unit after each win
/// while the session is still short of target, hold it after losses, drop
/// back to one unit once the target is reached.
#[derive(Debug)]
pub struct OscarsGrind {
    unit: Decimal,
    chance: Decimal,
    side: BetSide,
    target: Decimal,
    stake: Decimal,
}

impl OscarsGrind {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            unit: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            target: dec!(0.00000001),
            stake: dec!(0.00000001),
        })
    }
}

impl Strategy for OscarsGrind {
    fn name(&self) -> &'static str {
        "oscars-grind"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "oscars-grind",
            summary: "Escalates only on wins, grinding the session P/L up to a target.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "100x unit; drawdowns are shallow but long",
            volatility: "low-medium",
            time_to_profit: "patient; one unit of profit per completed grind",
            recommended_audience: "methodical players comfortable with long sessions",
            pros: &[
                "Losses never raise the stake",
                "Profit is locked in cycle by cycle",
            ],
            cons: &["A cold table stalls the grind at elevated stakes"],
            tips: &["The target is per grind cycle; use take-profit for the session"],
            params: vec![
                ParamSpec::decimal(
                    "unit",
                    dec!(0.00000001),
                    Some(Decimal::ZERO),
                    None,
                    "Stake increment in currency units",
                ),
                ParamSpec::decimal(
                    "target",
                    dec!(0.00000001),
                    Some(Decimal::ZERO),
                    None,
                    "Session profit target that completes a grind cycle",
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
        self.target = params.decimal("target")?;
        self.stake = self.unit;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult) {
        if !result.won {
            return;
        }
        if ctx.total_profit >= self.target {
            self.stake = self.unit;
        } else {
            self.stake += self.unit;
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

    fn outcome(won: bool, profit: Decimal, balance: Decimal) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(49.5), BetSide::High),
            roll: dec!(0),
            won,
            profit,
            balance_after: balance,
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
    fn escalates_on_wins_holds_on_losses_resets_at_target() {
        let mut s = OscarsGrind::boxed();
        let schema = s.metadata().params;
        let mut raw = HashMap::new();
        raw.insert("unit".to_string(), "1".to_string());
        raw.insert("target".to_string(), "3".to_string());
        let params = Params::parse(&schema, &raw).unwrap();
        let mut c = ctx();
        s.init(&params, &c).unwrap();

        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        // Loss: stake unchanged.
        let r = outcome(false, dec!(-1), dec!(99));
        c.record(&r);
        s.on_result(&c, &r);
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        // Win below target: escalate.
        let r = outcome(true, dec!(1), dec!(100));
        c.record(&r);
        s.on_result(&c, &r);
        assert_eq!(stake_of(s.next_bet(&c)), dec!(2));
        // Win that reaches the target: reset to one unit.
        let r = outcome(true, dec!(3), dec!(103));
        c.record(&r);
        s.on_result(&c, &r);
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
    }
}
