use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamSpec, Params, RiskLevel, StrategyContext, StrategyError,
    StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Positive progression: double the stake after each win, bank after N
/// wins in a row, reset after any loss.
#[derive(Debug)]
pub struct Paroli {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    wins_to_bank: i64,
    stake: Decimal,
    consecutive_wins: i64,
}

impl Paroli {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            wins_to_bank: 3,
            stake: dec!(0.00000001),
            consecutive_wins: 0,
        })
    }
}

impl Strategy for Paroli {
    fn name(&self) -> &'static str {
        "paroli"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "paroli",
            summary: "Doubles after wins, banks after three in a row, resets on loss.",
            risk_level: RiskLevel::Medium,
            bankroll_hint: "20x base is plenty; exposure per cycle is one base bet",
            volatility: "medium",
            time_to_profit: "needs three-win streaks; those are ~12% of cycles at 49.5%",
            recommended_audience: "streak riders with limited bankrolls",
            pros: &[
                "Risk per cycle never exceeds the base stake",
                "A completed cycle pays seven base bets",
            ],
            cons: &["Most cycles end one win short and give the profit back"],
            tips: &["Two-win cycles complete twice as often for half the payoff"],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec::integer(
                    "wins",
                    3,
                    Some(1),
                    Some(16),
                    "Bank the progression after this many straight wins",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.wins_to_bank = params.integer("wins")?;
        self.stake = self.base;
        self.consecutive_wins = 0;
        Ok(())
    }

    fn next_bet(&mut self, _ctx: &StrategyContext) -> Action {
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, _ctx: &StrategyContext, result: &BetResult) {
        if result.won {
            self.consecutive_wins += 1;
            if self.consecutive_wins >= self.wins_to_bank {
                self.stake = self.base;
                self.consecutive_wins = 0;
            } else {
                self.stake *= dec!(2);
            }
        } else {
            self.stake = self.base;
            self.consecutive_wins = 0;
        }
    }
}
