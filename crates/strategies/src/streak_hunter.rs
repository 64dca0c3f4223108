use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use dicebot_models::{
    BetResult, BetSide, BetSpec, ParamKind, ParamSpec, ParamValue, Params, RiskLevel,
    StrategyContext, StrategyError, StrategyMetadata,
};

use crate::common::{base_param, chance_param, parse_side, side_param};
use crate::{Action, Strategy};

/// Hunts winning streaks with a *decreasing* press schedule: each
/// consecutive win multiplies the stake by the next (smaller) factor, any
/// loss drops straight back to base. Optionally fires a tiny "lottery" bet
/// at very low chance whenever the streak is flat and the tick index lines
/// up with `lottery_period`.
#[derive(Debug)]
pub struct StreakHunter {
    base: Decimal,
    chance: Decimal,
    side: BetSide,
    multipliers: Vec<Decimal>,
    lottery_period: i64,
    lottery_chance: Decimal,
    lottery_stake: Decimal,
    stake: Decimal,
}

impl StreakHunter {
    pub fn boxed() -> Box<dyn Strategy> {
        Box::new(Self {
            base: dec!(0.00000001),
            chance: dec!(49.5),
            side: BetSide::High,
            multipliers: Vec::new(),
            lottery_period: 0,
            lottery_chance: dec!(0.01),
            lottery_stake: dec!(0.00000001),
            stake: dec!(0.00000001),
        })
    }

    fn is_lottery_tick(&self, ctx: &StrategyContext) -> bool {
        self.lottery_period > 0
            && ctx.streak == 0
            && ctx.bets % self.lottery_period as u64 == 0
    }

    fn multiplier_for_streak(&self, win_streak: u64) -> Decimal {
        let idx = (win_streak.saturating_sub(1)) as usize;
        self.multipliers
            .get(idx)
            .or_else(|| self.multipliers.last())
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    fn parse_multipliers(text: &str) -> Result<Vec<Decimal>, StrategyError> {
        let values: Result<Vec<Decimal>, _> = text
            .split(',')
            .map(|part| Decimal::from_str(part.trim()))
            .collect();
        let values = values.map_err(|e| {
            StrategyError::bad_parameter("multipliers", format!("not a decimal list: {e}"))
        })?;
        if values.is_empty() {
            return Err(StrategyError::bad_parameter("multipliers", "list is empty"));
        }
        if values.windows(2).any(|w| w[1] > w[0]) {
            return Err(StrategyError::bad_parameter(
                "multipliers",
                "press schedule must be non-increasing",
            ));
        }
        if values.iter().any(|v| *v < Decimal::ONE) {
            return Err(StrategyError::bad_parameter(
                "multipliers",
                "every multiplier must be at least 1",
            ));
        }
        Ok(values)
    }
}

impl Strategy for StreakHunter {
    fn name(&self) -> &'static str {
        "streak-hunter"
    }

    fn metadata(&self) -> StrategyMetadata {
        StrategyMetadata {
            name: "streak-hunter",
            summary: "Presses wins with a decreasing multiplier ladder; optional lottery side bet.",
            risk_level: RiskLevel::High,
            bankroll_hint: "50x base; presses are funded by winnings",
            volatility: "high when streaks land, flat otherwise",
            time_to_profit: "lumpy; one good streak carries the session",
            recommended_audience: "streak believers who want the press to cool down",
            pros: &[
                "Early streak wins are pressed hard, later ones conservatively",
                "Losses always return to base immediately",
            ],
            cons: &["Pays for every streak that dies at one"],
            tips: &[
                "The lottery branch is entertainment priced at its odds; keep its stake tiny",
            ],
            params: vec![
                base_param(dec!(0.00000001)),
                chance_param(),
                side_param(),
                ParamSpec {
                    name: "multipliers",
                    kind: ParamKind::Text,
                    default: ParamValue::Text("2.0,1.8,1.5,1.3,1.2".to_string()),
                    min: None,
                    max: None,
                    description: "Comma-separated non-increasing press factors per win streak",
                },
                ParamSpec::integer(
                    "lottery_period",
                    0,
                    Some(0),
                    Some(100_000),
                    "Fire a lottery bet every N ticks while the streak is flat (0 = off)",
                ),
                ParamSpec::chance("lottery_chance", dec!(0.01), "Win chance of the lottery bet"),
                ParamSpec::decimal(
                    "lottery_stake",
                    dec!(0.00000001),
                    Some(Decimal::ZERO),
                    None,
                    "Stake of the lottery bet",
                ),
            ],
        }
    }

    fn init(&mut self, params: &Params, _ctx: &StrategyContext) -> Result<(), StrategyError> {
        self.base = params.decimal("base")?;
        self.chance = params.decimal("chance")?;
        self.side = parse_side(params)?;
        self.multipliers = Self::parse_multipliers(params.text("multipliers")?)?;
        self.lottery_period = params.integer("lottery_period")?;
        self.lottery_chance = params.decimal("lottery_chance")?;
        self.lottery_stake = params.decimal("lottery_stake")?;
        self.stake = self.base;
        Ok(())
    }

    fn next_bet(&mut self, ctx: &StrategyContext) -> Action {
        if self.is_lottery_tick(ctx) {
            return Action::Bet(BetSpec::dice(
                self.lottery_stake,
                self.lottery_chance,
                self.side,
            ));
        }
        Action::Bet(BetSpec::dice(self.stake, self.chance, self.side))
    }

    fn on_result(&mut self, ctx: &StrategyContext, result: &BetResult) {
        // Lottery outcomes never touch the press ladder.
        if result.spec.kind.win_chance_percent() == self.lottery_chance
            && self.lottery_chance != self.chance
        {
            return;
        }
        if result.won {
            self.stake *= self.multiplier_for_streak(ctx.streak.max(0) as u64);
        } else {
            self.stake = self.base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::Currency;
    use std::collections::HashMap;

    fn ctx() -> StrategyContext {
        StrategyContext::new(Currency::new("btc"), dec!(0.03), dec!(100), 8, Utc::now())
    }

    fn init_with(s: &mut dyn Strategy, pairs: &[(&str, &str)]) {
        let schema = s.metadata().params;
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let params = Params::parse(&schema, &raw).unwrap();
        s.init(&params, &ctx()).unwrap();
    }

    fn outcome(won: bool, chance: Decimal, stake: Decimal) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(stake, chance, BetSide::High),
            roll: dec!(0),
            won,
            profit: dec!(0),
            balance_after: dec!(100),
            fairness: None,
        }
    }

    fn stake_of(action: Action) -> Decimal {
        match action {
            Action::Bet(spec) => spec.amount,
            other => panic!("expected a bet, got {other:?}"),
        }
    }

    #[test]
    fn press_schedule_decreases_and_resets() {
        let mut s = StreakHunter::boxed();
        init_with(s.as_mut(), &[("base", "1"), ("multipliers", "2.0,1.5")]);
        let mut c = ctx();

        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
        let r = outcome(true, dec!(49.5), dec!(1));
        c.record(&r);
        s.on_result(&c, &r);
        // First win: 1 * 2.0
        assert_eq!(stake_of(s.next_bet(&c)), dec!(2));
        let r = outcome(true, dec!(49.5), dec!(2));
        c.record(&r);
        s.on_result(&c, &r);
        // Second win: 2 * 1.5; schedule tail reused afterwards
        assert_eq!(stake_of(s.next_bet(&c)), dec!(3));
        let r = outcome(false, dec!(49.5), dec!(3));
        c.record(&r);
        s.on_result(&c, &r);
        assert_eq!(stake_of(s.next_bet(&c)), dec!(1));
    }

    #[test]
    fn rejects_increasing_schedules() {
        assert!(StreakHunter::parse_multipliers("1.5,2.0").is_err());
        assert!(StreakHunter::parse_multipliers("").is_err());
        assert!(StreakHunter::parse_multipliers("2.0,1.5,1.5").is_ok());
    }

    #[test]
    fn lottery_fires_only_on_flat_streak_at_period() {
        let mut s = StreakHunter::boxed();
        init_with(
            s.as_mut(),
            &[
                ("base", "1"),
                ("lottery_period", "2"),
                ("lottery_chance", "0.05"),
                ("lottery_stake", "0.1"),
            ],
        );
        let c = ctx();
        // Fresh session: streak 0, bets 0, 0 % 2 == 0 -> lottery tick.
        let spec = match s.next_bet(&c) {
            Action::Bet(spec) => spec,
            other => panic!("expected a bet, got {other:?}"),
        };
        assert_eq!(spec.amount, dec!(0.1));
        assert_eq!(spec.kind.win_chance_percent(), dec!(0.05));
        // A lottery loss does not move the ladder off base.
        let r = outcome(false, dec!(0.05), dec!(0.1));
        let mut c2 = ctx();
        c2.record(&r);
        s.on_result(&c2, &r);
        assert_eq!(stake_of(s.next_bet(&c2)), dec!(1));
    }
}
