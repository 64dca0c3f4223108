use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Classic loss progression: multiply the stake after every loss, reset to
/// base after a win. `max_streak > 0` aborts the session after that many
/// consecutive losses instead of chasing them forever.
#[derive(Debug)]
pub struct ClassicMartingale {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    multiplier: Decimal,
    max_streak: i64,
    stake: Decimal,
}

impl ClassicMartingale {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            multiplier: dec!(2),
            max_streak: 0,
            stake: dec!(0.00000001),
        })
    }
}

impl Strategy for ClassicMartingale {
    fn name(&self) -> &'static str {
        "classic-martingale"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "classic-martingale",
            summary: "Doubles the stake after every loss, resets after a win.",
            risk_level: RiskLevel::Extreme,
            bankroll_hint: "at least multiplier^10 x base to survive ten losses",
            volatility: "extreme",
            time_to_profit: "fast until the losing run that takes it all",
            recommended_audience: "thrill seekers with a strict stop-loss",
            pros: &[
                "Recovers every loss plus one base-bet profit on the next win",
                "Simple to reason about",
            ],
            cons: &[
                "Stake grows exponentially during a losing run",
                "A long streak busts the bankroll or hits the table maximum",
            ],
            tips: &[
                "Set max_streak so a bad run stops the session, not your balance",
                "Pair with a stop-loss well above the worst-case progression cost",
            ],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::decimal(
                    "multiplier",
                    dec!(2),
                    Some(dec!(1.01)),
                    Some(dec!(10)),
                    "Stake multiplier applied after a loss",
                ),
                ParamSpec::integer(
                    "max_streak",
                    0,
                    Some(0),
                    Some(64),
                    "Abort after this many consecutive losses (0 = never)",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.multiplier = params.decimal("multiplier")?;
        self.max_streak = params.integer("max_streak")?;
        self.stake = self.base;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        if self.max_streak > 0 && ctx.streak <= -self.max_streak {
            return Action::Stop(format!(
                "loss streak reached max_streak {}",
                self.max_streak
            ));
        }
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.stake = self.base;
        } else {
            self.stake *= self.multiplier;
        }
    }
}

/// Mirror image: multiply after wins, reset after a loss. Rides winning
/// streaks with house money instead of chasing losses.
#[derive(Debug)]
pub struct AntiMartingaleStreak {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    multiplier: Decimal,
    max_streak: i64,
    stake: Decimal,
}

impl AntiMartingaleStreak {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            multiplier: dec!(2),
            max_streak: 3,
            stake: dec!(0.00000001),
        })
    }
}

impl Strategy for AntiMartingaleStreak {
    fn name(&self) -> &'static str {
        "anti-martingale-streak"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "anti-martingale-streak",
            summary: "Presses winning streaks: multiply on win, reset on loss.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "20-50x base stake",
            volatility: "medium; losses are always one base bet",
            time_to_profit: "needs a streak; flat otherwise",
            recommended_audience: "players who want capped downside per cycle",
            pros: &[
                "Only ever risks base plus accumulated winnings",
                "A capped streak banks profit automatically",
            ],
            cons: &["Gives back the streak's profit on the loss that ends it"],
            tips: &["Lower max_streak banks smaller streaks more often"],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::decimal(
                    "multiplier",
                    dec!(2),
                    Some(dec!(1.01)),
                    Some(dec!(10)),
                    "Stake multiplier applied after a win",
                ),
                ParamSpec::integer(
                    "max_streak",
                    3,
                    Some(1),
                    Some(32),
                    "Reset the progression after this many consecutive wins",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.multiplier = params.decimal("multiplier")?;
        self.max_streak = params.integer("max_streak")?;
        self.stake = self.base;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            if ctx.streak >= self.max_streak {
                self.stake = self.base;
            } else {
                self.stake *= self.multiplier;
            }
        } else {
            self.stake = self.base;
        }
    }
}
