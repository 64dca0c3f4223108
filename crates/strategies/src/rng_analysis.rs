use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Modulates a flat stake by the observed win rate over a recent window:
/// +20% when the window runs hot, -20% when it runs cold, back to flat when
/// the rate collapses below the floor. The dice do not remember, but the
/// stake schedule is at least disciplined about it.
#[derive(Debug)]
pub struct RngAnalysis {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    window: usize,
    hot: f64,
    cold: f64,
    floor: f64,
}

impl RngAnalysis {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            window: 25,
            hot: 0.6,
            cold: 0.4,
            floor: 0.3,
        })
    }

    fn window_rate(&self, ctx: &StrategyContext) -> Option<f64> {
        let seen: Vec<&BetResult> = ctx.history.iter().rev().take(self.window).collect();
        if seen.len() < self.window {
            return None;
        }
        let wins = seen.iter().filter(|r| r.won).count();
        Some(wins as f64 / seen.len() as f64)
    }

    fn modulation(&self, ctx: &StrategyContext) -> Decimal {
        match self.window_rate(ctx) {
            Some(rate) if rate < self.floor => Decimal::ONE,
            Some(rate) if rate > self.hot => dec!(1.2),
            Some(rate) if rate < self.cold => dec!(0.8),
            _ => Decimal::ONE,
        }
    }
}

impl Strategy for RngAnalysis {
    fn name(&self) -> &'static str {
        "rng-analysis"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "rng-analysis",
            summary: "Nudges a flat stake up or down 20% from the recent window's win rate.",
            risk_level: RiskLevel::Low,
            bankroll_hint: "as for flat, plus 20% headroom",
            volatility: "low",
            time_to_profit: "as for flat; the modulation is cosmetic discipline",
            recommended_audience: "flat bettors who want a rules-based nudge",
            pros: &[
                "Bounded deviation from flat betting",
                "The floor rule kills the modulation in genuinely bad runs",
            ],
            cons: &["Past rolls carry no information about future ones"],
            tips: &["Treat this as flat betting with a mood; budget accordingly"],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::integer("window", 25, Some(5), Some(500), "Win-rate window in bets"),
                ParamSpec::decimal(
                    "hot",
                    dec!(0.6),
                    Some(dec!(0)),
                    Some(dec!(1)),
                    "Win rate above which the stake is raised 20%",
                ),
                ParamSpec::decimal(
                    "cold",
                    dec!(0.4),
                    Some(dec!(0)),
                    Some(dec!(1)),
                    "Win rate below which the stake is trimmed 20%",
                ),
                ParamSpec::decimal(
                    "floor",
                    dec!(0.3),
                    Some(dec!(0)),
                    Some(dec!(1)),
                    "Win rate below which all modulation resets to flat",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.window = params.integer("window")? as usize;
        self.hot = dicebot_models::money::to_f64(params.decimal("hot")?);
        self.cold = dicebot_models::money::to_f64(params.decimal("cold")?);
        self.floor = dicebot_models::money::to_f64(params.decimal("floor")?);
        if self.floor > self.cold || self.cold >= self.hot {
            return Err(StrategyError::bad_parameter(
                "hot",
                "thresholds must satisfy floor <= cold < hot",
            ));
        }
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        let stake = self.base * self.modulation(ctx);
        Action::Bet(BetSpec::dice(stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, _result: &BetResult) {}

    fn history_window(&self) -> usize {
        self.window
    }
}
