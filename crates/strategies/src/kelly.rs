use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    money, BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext,
    StrategyError, StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Kelly-fraction sizing with a hard cap: `stake = min(base, f * balance)`.
///
/// The raw Kelly fraction for a negative-expectancy game is never positive,
/// so `f` is derived from an assumed player edge over the quoted chance and
/// clamped to `[0, max_fraction]`. The cap (`base`) always wins.
#[derive(Debug)]
pub struct KellyCapped {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    assumed_edge: f64,
    max_fraction: f64,
}

impl KellyCapped {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000100),
            chance: dec!(49.5),
            side: BetSide::High,
            assumed_edge: 0.01,
            max_fraction: 0.05,
        })
    }

    /// Clamped Kelly fraction for the configured chance.
    /// `f = (b*p - q) / b` with `b` the net fair odds at the quoted chance
    /// and `p` the chance inflated by the assumed edge.
    fn fraction(&self) -> f64 {
        let chance = money::to_f64(self.chance) / 100.0;
        let b = (1.0 / chance) - 1.0;
        if b <= 0.0 {
            return 0.0;
        }
        let p = (chance * (1.0 + self.assumed_edge)).min(0.99);
        let q = 1.0 - p;
        ((b * p - q) / b).clamp(0.0, self.max_fraction)
    }
}

impl Strategy for KellyCapped {
    fn name(&self) -> &'static str {
        "kelly-capped"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "kelly-capped",
            summary: "Sizes stakes as a clamped Kelly fraction of the balance, capped at base.",
            risk_level: RiskLevel::Low,
            bankroll_hint: "self-scaling; stakes shrink with the balance",
            volatility: "low",
            time_to_profit: "geometric-growth sizing; the house edge still wins long-run",
            recommended_audience: "bankroll-management purists",
            pros: &[
                "Stake shrinks automatically during drawdowns",
                "Hard cap keeps the fraction honest on big balances",
            ],
            cons: &["Assumed edge is a belief, not a fact; the true edge is negative"],
            tips: &["Leave max_fraction small; full Kelly is wild even when the edge is real"],
            params: vec![
                base_param(dec!(0.00000100)),
                chance_param(),
                side_param(),
                ParamSpec::decimal(
                    "assumed_edge",
                    dec!(0.01),
                    Some(Decimal::ZERO),
                    Some(dec!(0.5)),
                    "Edge over the quoted chance assumed when deriving the Kelly fraction",
                ),
                ParamSpec::decimal(
                    "max_fraction",
                    dec!(0.05),
                    Some(dec!(0.0001)),
                    Some(dec!(1)),
                    "Upper clamp on the Kelly fraction of balance",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.assumed_edge = params
            .decimal("assumed_edge")?
            .to_f64()
            .unwrap_or(0.0);
        self.max_fraction = params
            .decimal("max_fraction")?
            .to_f64()
            .unwrap_or(0.05);
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        let f = Decimal::from_f64(self.fraction()).unwrap_or(Decimal::ZERO);
        let sized = money::round_down(ctx.balance * f);
        let stake = sized.min(self.base);
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}
