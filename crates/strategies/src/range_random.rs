use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSpec, ParamSpec, Params, RangeMode, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, tick_rng};
use crate::{Action, Strategy};

const WIDTH: u16 = 50;
const ROLL_SPAN: u16 = 10_000;

/// Constant-stake range bets on a randomly placed window of width 50
/// (a 0.5% chance). The window position is derived from the seed and the
/// tick index, so identical state always proposes the identical interval.
#[derive(Debug)]
pub struct Range50Random {
    base: Decimal,
    seed: u64,
}

impl Range50Random {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            seed: 0,
        })
    }
}

impl Strategy for Range50Random {
    fn name(&self) -> &'static str {
        "range-50-random"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "range-50-random",
            summary: "Flat stakes on a width-50 range window placed pseudo-randomly each tick.",
            risk_level: RiskLevel::High,
            bankroll_hint: "200x base; 0.5% hits are rare",
            volatility: "high; long droughts punctuated by ~190x payouts",
            time_to_profit: "lottery-shaped",
            recommended_audience: "players chasing big multipliers with fixed cost",
            pros: &[
                "Cost per tick is constant and known",
                "A single hit pays for a long drought",
            ],
            cons: &["Where the window sits changes nothing about the odds"],
            tips: &["The moving window is cosmetic; size the base for the drought"],
            params: vec![
                base_param(dec!(0.00000001)),
                ParamSpec::integer(
                    "seed",
                    0,
                    Some(0),
                    None,
                    "Seed for the window placement sequence",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.seed = params.integer("seed")? as u64;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        let low = tick_rng(self.seed, ctx.bets).gen_range(0..=(ROLL_SPAN - WIDTH));
        Action::Bet(BetSpec::range(
            self.base,
            low,
            low + WIDTH - 1,
            RangeMode::In,
        ))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::{BetKind, Currency};
    use std::collections::HashMap;

    fn ctx() -> StrategyContext {
        StrategyContext::new(Currency::new("btc"), dec!(0.03), dec!(100), 0, Utc::now())
    }

    #[test]
    fn window_is_width_50_and_deterministic_per_tick() {
        let mut s = Range50Random::boxed();
        let schema = s.metadata().params;
        let params = Params::parse(&schema, &HashMap::new()).unwrap();
        s.init(&params, &ctx()).unwrap();
        let c = ctx();

        let first = s.next_bet(&c);
        let second = s.next_bet(&c);
        assert_eq!(first, second);

        match first {
            Action::Bet(spec) => match spec.kind {
                BetKind::Range { low, high, mode } => {
                    assert_eq!(mode, RangeMode::In);
                    assert_eq!(high - low + 1, WIDTH);
                    assert!(high < ROLL_SPAN);
                    assert_eq!(spec.kind.win_chance_percent(), dec!(0.5));
                }
                BetKind::Dice { .. } => panic!("expected a range bet"),
            },
            other => panic!("expected a bet, got {other:?}"),
        }
    }
}
