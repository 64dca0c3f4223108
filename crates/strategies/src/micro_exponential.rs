use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    money, BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext,
    StrategyError, StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

fn growth_params() -> Vec<ParamSpec> {
    vec![
        base_param(dec!(0.00000001)),
        chance_param(),
        side_param(),
        ParamSpec::decimal(
            "growth",
            dec!(2),
            Some(dec!(1.01)),
            Some(dec!(10)),
            "Per-win stake growth factor r in base * r^k",
        ),
        ParamSpec::integer(
            "k_max",
            5,
            Some(1),
            Some(32),
            "Cap on the win exponent k",
        ),
    ]
}

fn pow(growth: Decimal, k: u32) -> Decimal {
    let mut acc = Decimal::ONE;
    for _ in 0..k {
        acc *= growth;
    }
    acc
}

/// Win-compounding micro progression: `stake = base * r^k` where `k`
/// counts consecutive wins up to `k_max`; any loss resets `k` to zero.
#[derive(Debug)]
pub struct MicroExponential {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    growth: Decimal,
    k_max: u32,
    k: u32,
}

impl MicroExponential {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            growth: dec!(2),
            k_max: 5,
            k: 0,
        })
    }
}

impl Strategy for MicroExponential {
    fn name(&self) -> &'static str {
        "micro-exponential"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "micro-exponential",
            summary: "Stake grows as base * r^k across win runs, resetting on any loss.",
            risk_level: RiskLevel::High,
            bankroll_hint: "exposure is bounded by base * r^k_max per run",
            volatility: "high at deep k",
            time_to_profit: "a capped run multiplies the base bet r^k_max-fold",
            recommended_audience: "win-progression players wanting explicit caps",
            pros: &[
                "Losses always cost exactly the current rung, never a chase",
                "k_max bounds the worst give-back",
            ],
            cons: &["Runs that die just before k_max return their profit"],
            tips: &["Lower growth with higher k_max rides longer, shallower runs"],
            params: growth_params(),
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.growth = params.decimal("growth")?;
        self.k_max = params.integer("k_max")? as u32;
        self.k = 0;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        let stake = self.base * pow(self.growth, self.k);
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.k = (self.k + 1).min(self.k_max);
        } else {
            self.k = 0;
        }
    }
}

/// Same progression with a second brake: the stake is additionally capped
/// to a fraction of the live balance, so deep runs cannot outgrow the
/// bankroll that funds them.
#[derive(Debug)]
pub struct MicroExponentialSafe {
    inner: MicroExponential,
    balance_cap: Decimal,
}

impl MicroExponentialSafe {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            inner: MicroExponential {
                base: dec!(0.00000001),
                chance: dec!(49.5),
                side: BetSide::High,
                growth: dec!(2),
                k_max: 5,
                k: 0,
            },
            balance_cap: dec!(0.05),
        })
    }
}

impl Strategy for MicroExponentialSafe {
    fn name(&self) -> &'static str {
        "micro-exponential-safe"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "micro-exponential-safe",
            summary: "micro-exponential with stakes additionally capped to a balance fraction.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "any; the balance cap scales exposure down automatically",
            volatility: "medium",
            time_to_profit: "slower than the uncapped variant at deep k",
            recommended_audience: "win-progression players on small bankrolls",
            pros: &[
                "No single bet can exceed the configured balance slice",
                "Inherits the bounded give-back of micro-exponential",
            ],
            cons: &["The cap flattens exactly the runs the progression exists for"],
            tips: &["Set the cap so base * r^k_max only binds near bust"],
            params: {
                let mut params = growth_params();
                params.push(ParamSpec::decimal(
                    "balance_cap",
                    dec!(0.05),
                    Some(dec!(0.001)),
                    Some(dec!(1)),
                    "Maximum stake as a fraction of current balance",
                ));
                params
            },
        }
    }

    fn init(&mut self, params: &Params, ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.inner.init(params, ctx)?;
        self.balance_cap = params.decimal("balance_cap")?;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        match self.inner.next_bet(ctx) {
            Action::Bet(mut spec) => {
                let cap = money::round_down(ctx.balance * self.balance_cap);
                spec.amount = spec.amount.min(cap);
                Action::Bet(spec)
            }
            other => other,
        }
    }

    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult) {
        self.inner.on_result(ctx, result);
    }
}
