use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    money, BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext,
    StrategyError, StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Which regime the session is in, judged from P/L and drawdown each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Ahead or level: size stakes to finish the target in two wins.
    Grow,
    /// Underwater: size stakes to erase the deficit in one win.
    Recover,
    /// Drawdown beyond the limit: retreat to base and wait it out.
    Drawdown,
    /// Nearly there: one careful win closes the session target.
    Consolidate,
}

/// Four-phase controller that resizes stakes around a session profit
/// target instead of following a fixed progression.
#[derive(Debug)]
pub struct TargetAware {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    target: Decimal,
    drawdown_limit: Decimal,
    max_balance_fraction: Decimal,
}

impl TargetAware {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            target: dec!(0.00000100),
            drawdown_limit: dec!(0.00000050),
            max_balance_fraction: dec!(0.1),
        })
    }

    fn phase(&self, ctx: &StrategyContext) -> Phase {
        if ctx.drawdown() > self.drawdown_limit {
            Phase::Drawdown
        } else if ctx.total_profit >= self.target * dec!(0.8) {
            Phase::Consolidate
        } else if ctx.total_profit < Decimal::ZERO {
            Phase::Recover
        } else {
            Phase::Grow
        }
    }

    /// Stake that nets `gap` in a single win at the configured chance.
    fn stake_for_gap(&self, gap: Decimal, house_edge: Decimal) -> Decimal {
        let net = dec!(100) / self.chance * (Decimal::ONE - house_edge) - Decimal::ONE;
        if net <= Decimal::ZERO {
            return self.base;
        }
        money::round_down(gap / net)
    }

    fn clamp(&self, stake: Decimal, balance: Decimal) -> Decimal {
        let cap = money::round_down(balance * self.max_balance_fraction);
        stake.clamp(self.base, cap.max(self.base))
    }
}

impl Strategy for TargetAware {
    fn name(&self) -> &'static str {
        "target-aware"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "target-aware",
            summary: "Grow/Recover/Drawdown/Consolidate controller sized around a session target.",
            risk_level: RiskLevel::High,
            bankroll_hint: "10x the target plus the drawdown limit",
            volatility: "adaptive; spikes while recovering",
            time_to_profit: "aims to close the target within a handful of wins",
            recommended_audience: "goal-oriented players who accept recovery sizing",
            pros: &[
                "Stops pressing once the target is within one win",
                "Backs off automatically in deep drawdown",
            ],
            cons: &["Recovery stakes grow with the deficit, like any chase"],
            tips: &["The balance-fraction cap is the real safety net; keep it tight"],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::decimal(
                    "target",
                    dec!(0.00000100),
                    Some(Decimal::ZERO),
                    None,
                    "Session profit target in currency units",
                ),
                ParamSpec::decimal(
                    "drawdown_limit",
                    dec!(0.00000050),
                    Some(Decimal::ZERO),
                    None,
                    "Drawdown from the session peak that forces the retreat phase",
                ),
                ParamSpec::decimal(
                    "max_balance_fraction",
                    dec!(0.1),
                    Some(dec!(0.001)),
                    Some(dec!(1)),
                    "Hard cap on any stake as a fraction of balance",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.target = params.decimal("target")?;
        self.drawdown_limit = params.decimal("drawdown_limit")?;
        self.max_balance_fraction = params.decimal("max_balance_fraction")?;
        if self.target <= Decimal::ZERO {
            return Err(StrategyError::bad_parameter("target", "must be positive"));
        }
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        if ctx.total_profit >= self.target {
            return Action::Stop(format!(
                "session target {} reached",
                money::format_amount(self.target)
            ));
        }
        let stake = match self.phase(ctx) {
            Phase::Drawdown => self.base,
            Phase::Grow => {
                // Two wins to target.
                let gap = (self.target - ctx.total_profit) / dec!(2);
                self.stake_for_gap(gap, ctx.house_edge)
            }
            Phase::Recover => self.stake_for_gap(-ctx.total_profit, ctx.house_edge),
            Phase::Consolidate => {
                self.stake_for_gap(self.target - ctx.total_profit, ctx.house_edge)
            }
        };
        Action::Bet(BetSpec::dice(
            self.clamp(stake, ctx.balance),
            self.chance,
            self.side,
        ))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::Currency;
    use std::collections::HashMap;

    fn base_ctx() -> StrategyContext {
        StrategyContext::new(Currency::new("btc"), dec!(0.03), dec!(100), 0, Utc::now())
    }

    fn strategy() -> TargetAware {
        let mut s = TargetAware {
            base: dec!(0.01),
            chance: dec!(49.5),
            side: BetSide::High,
            target: dec!(10),
            drawdown_limit: dec!(5),
            max_balance_fraction: dec!(0.1),
        };
        let schema = s.metadata().params;
        let raw: HashMap<String, String> = [
            ("base", "0.01"),
            ("target", "10"),
            ("drawdown_limit", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let params = Params::parse(&schema, &raw).unwrap();
        s.init(&params, &base_ctx()).unwrap();
        s
    }

    #[test]
    fn phases_follow_profit_and_drawdown() {
        let s = strategy();
        let mut ctx = base_ctx();
        assert_eq!(s.phase(&ctx), Phase::Grow);

        ctx.total_profit = dec!(-2);
        assert_eq!(s.phase(&ctx), Phase::Recover);

        ctx.total_profit = dec!(9);
        assert_eq!(s.phase(&ctx), Phase::Consolidate);

        ctx.peak_balance = dec!(110);
        ctx.balance = dec!(100);
        assert_eq!(s.phase(&ctx), Phase::Drawdown);
    }

    #[test]
    fn stops_at_target_and_caps_recovery_stakes() {
        let mut s = strategy();
        let mut ctx = base_ctx();

        ctx.total_profit = dec!(10);
        assert!(matches!(s.next_bet(&ctx), Action::Stop(_)));

        // Deep deficit: the balance-fraction cap bounds the chase.
        ctx.total_profit = dec!(-50);
        ctx.balance = dec!(50);
        match s.next_bet(&ctx) {
            Action::Bet(spec) => assert!(spec.amount <= dec!(5)),
            other => panic!("expected a bet, got {other:?}"),
        }
    }
}
