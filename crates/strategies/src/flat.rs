use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Constant stake, every tick. The baseline everything else is measured
/// against.
#[derive(Debug)]
pub struct Flat {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
}

impl Flat {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
        })
    }
}

impl Strategy for Flat {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "flat",
            summary: "Bets the same amount every roll, win or lose.",
            risk_level: RiskLevel::Low,
            bankroll_hint: "50-100x base stake",
            volatility: "low",
            time_to_profit: "slow and steady; expectancy is the house edge",
            recommended_audience: "beginners, long grinding sessions",
            pros: &[
                "Bankroll drains at the slowest possible rate",
                "No progression to blow up after a losing run",
            ],
            cons: &["Cannot recover losses faster than it makes them"],
            tips: &["Pair with a take-profit so winning streaks are banked"],
            params: vec![base_param(dec!(0.00000001)), chance_param(), side_param()],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        Action::Bet(BetSpec::dice(self.base, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}
