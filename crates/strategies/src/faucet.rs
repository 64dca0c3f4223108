use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    money, BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext,
    StrategyError, StrategyMetadata,
};

use crate::common::{parse_side, side_param};
use crate::{Action, Strategy};

const MIN_CHANCE: Decimal = dec!(0.01);
const MAX_CHANCE: Decimal = dec!(98);

/// All-in faucet ladder: claim, then shoot the whole balance at exactly the
/// chance that would land on `target` if it wins. A loss costs only faucet
/// money; claim again and repeat.
///
/// The chance solves `balance * (100 / c) * (1 - edge) = target`, i.e.
/// `c = 100 * balance * (1 - edge) / target`, clamped to the house limits.
#[derive(Debug)]
pub struct FaucetGrind {
    target: Decimal,
    side: BetSide,
}

impl FaucetGrind {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            target: dec!(0.001),
            side: BetSide::High,
        })
    }

    fn all_in_chance(&self, balance: Decimal, house_edge: Decimal) -> Decimal {
        if self.target <= Decimal::ZERO {
            return MAX_CHANCE;
        }
        let chance = dec!(100) * balance * (Decimal::ONE - house_edge) / self.target;
        chance.clamp(MIN_CHANCE, MAX_CHANCE)
    }
}

impl Strategy for FaucetGrind {
    fn name(&self) -> &'static str {
        "faucet-grind"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "faucet-grind",
            summary: "Claims the faucet and bets it all at the one chance that reaches the target.",
            risk_level: RiskLevel::Extreme,
            bankroll_hint: "zero; the faucet is the bankroll",
            volatility: "binary: bust or target, every bet",
            time_to_profit: "one lucky roll; expect many claim cycles first",
            recommended_audience: "faucet players with patience and nothing staked",
            pros: &[
                "Never risks deposited money",
                "Exactly one bet per claim; nothing to tune mid-run",
            ],
            cons: &["Hit probability per cycle is tiny by construction"],
            tips: &["A lower target raises the per-cycle chance dramatically"],
            params: vec![
                ParamSpec::decimal(
                    "target",
                    dec!(0.001),
                    Some(Decimal::ZERO),
                    None,
                    "Balance to reach in one winning all-in, in currency units",
                ),
                side_param(),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.target = params.decimal("target")?;
        if self.target <= Decimal::ZERO {
            return Err(StrategyError::bad_parameter("target", "must be positive"));
        }
        self.side = parse_side(params)?;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        if ctx.balance >= self.target {
            return Action::Stop(format!(
                "target {} reached with balance {}",
                money::format_amount(self.target),
                money::format_amount(ctx.balance)
            ));
        }
        if ctx.balance <= Decimal::ZERO {
            if ctx.faucet_claimable() {
                return Action::ClaimFaucet;
            }
            return Action::Skip;
        }
        let chance = self.all_in_chance(ctx.balance, ctx.house_edge);
        Action::Bet(BetSpec::dice(ctx.balance, chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}

/// Accumulate faucet claims only; never bets. Stops once the balance
/// crosses the cash-out threshold so the user can withdraw.
#[derive(Debug)]
pub struct FaucetCashout {
    threshold: Decimal,
}

impl FaucetCashout {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            threshold: dec!(0.001),
        })
    }
}

impl Strategy for FaucetCashout {
    fn name(&self) -> &'static str {
        "faucet-cashout"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "faucet-cashout",
            summary: "Only claims the faucet, stopping when the balance reaches the threshold.",
            risk_level: RiskLevel::Low,
            bankroll_hint: "zero; nothing is ever wagered",
            volatility: "none",
            time_to_profit: "deterministic: claims x claim value",
            recommended_audience: "pure faucet farmers",
            pros: &["Zero wagering risk", "Fully unattended"],
            cons: &["Slow; bound by the faucet's claim rate"],
            tips: &["The claim API's own schedule drives the pace; the bot just waits"],
            params: vec![ParamSpec::decimal(
                "threshold",
                dec!(0.001),
                Some(Decimal::ZERO),
                None,
                "Balance at which to stop and cash out, in currency units",
            )],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.threshold = params.decimal("threshold")?;
        if self.threshold <= Decimal::ZERO {
            return Err(StrategyError::bad_parameter("threshold", "must be positive"));
        }
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        if ctx.balance >= self.threshold {
            return Action::Stop(format!(
                "cash-out threshold {} reached",
                money::format_amount(self.threshold)
            ));
        }
        if ctx.faucet_claimable() {
            Action::ClaimFaucet
        } else {
            Action::Skip
        }
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}
