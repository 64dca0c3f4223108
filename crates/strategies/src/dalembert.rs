use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Arithmetic progression: add one unit after a loss, subtract one after a
/// win, never below one unit.
#[derive(Debug)]
pub struct DAlembert {
    unit: Decimal,
    chance: Decimal,
    side: BetSide,
    stake: Decimal,
}

impl DAlembert {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            unit: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            stake: dec!(0.00000001),
        })
    }
}

impl Strategy for DAlembert {
    fn name(&self) -> &'static str {
        "dalembert"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "dalembert",
            summary: "Adds a unit after each loss, removes one after each win.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "100x unit or more",
            volatility: "medium; stakes drift rather than explode",
            time_to_profit: "slow; profits come from win/loss alternation",
            recommended_audience: "cautious progression players",
            pros: &[
                "Linear growth is far safer than geometric",
                "Every win at an elevated stake claws back a past loss",
            ],
            cons: &["Prolonged cold runs still ratchet the stake up unit by unit"],
            tips: &["Choose the unit so a 20-step ladder is survivable"],
            params: vec![
                ParamSpec::decimal(
                    "unit",
                    dec!(0.00000001),
                    Some(Decimal::ZERO),
                    None,
                    "Ladder step size in currency units",
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
        self.stake = self.unit;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.stake = (self.stake - self.unit).max(self.unit);
        } else {
            self.stake += self.unit;
        }
    }
}
