use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use dicebot_models::{money, BetResult};

/// Count- and streak-based performance figures over a bet stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub win_rate: f64,
    pub total_wagered: Decimal,
    pub profit: Decimal,
    /// Profit per unit wagered.
    pub roi: f64,
    pub longest_win_streak: u64,
    pub longest_loss_streak: u64,
    pub average_stake: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    /// Gross wins over gross losses; `None` until there is at least one loss.
    pub profit_factor: Option<f64>,
    /// Expected value per unit staked, the empirical house edge.
    pub ev_per_unit: f64,
}

/// Risk figures over the same stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: f64,
    pub current_drawdown: Decimal,
    pub profit_variance: f64,
    pub profit_std_dev: f64,
    /// Simplified ruin probability, clamped to [0, 1].
    pub risk_of_ruin: f64,
    /// Ten times the observed max drawdown.
    pub suggested_bankroll: Decimal,
}

/// Single-pass accumulator: feed it results in order, read reports at any
/// point. Holds O(1) state regardless of stream length.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    bets: u64,
    wins: u64,
    losses: u64,
    total_wagered: Decimal,
    total_profit: Decimal,
    gross_wins: Decimal,
    gross_losses: Decimal,
    streak: i64,
    longest_win_streak: u64,
    longest_loss_streak: u64,
    // Welford running variance over per-bet profit.
    mean_profit: f64,
    m2_profit: f64,
    // Drawdown scan over balance-after.
    peak_balance: Option<Decimal>,
    max_drawdown: Decimal,
    max_drawdown_pct: f64,
    last_balance: Decimal,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &BetResult) {
        self.bets += 1;
        self.total_wagered += result.spec.amount;
        self.total_profit += result.profit;
        if result.won {
            self.wins += 1;
            self.gross_wins += result.profit;
            self.streak = if self.streak > 0 { self.streak + 1 } else { 1 };
            self.longest_win_streak = self.longest_win_streak.max(self.streak as u64);
        } else {
            self.losses += 1;
            self.gross_losses += -result.profit;
            self.streak = if self.streak < 0 { self.streak - 1 } else { -1 };
            self.longest_loss_streak = self.longest_loss_streak.max(self.streak.unsigned_abs());
        }

        let profit = money::to_f64(result.profit);
        let delta = profit - self.mean_profit;
        self.mean_profit += delta / self.bets as f64;
        self.m2_profit += delta * (profit - self.mean_profit);

        self.last_balance = result.balance_after;
        let peak = match self.peak_balance {
            Some(peak) if peak >= result.balance_after => peak,
            _ => result.balance_after,
        };
        self.peak_balance = Some(peak);
        let drawdown = peak - result.balance_after;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
            self.max_drawdown_pct = if peak > Decimal::ZERO {
                money::to_f64(drawdown) / money::to_f64(peak)
            } else {
                0.0
            };
        }
    }

    pub fn performance(&self) -> PerformanceReport {
        let bets = self.bets.max(1) as f64;
        PerformanceReport {
            total_bets: self.bets,
            wins: self.wins,
            losses: self.losses,
            win_rate: self.wins as f64 / bets,
            total_wagered: self.total_wagered,
            profit: self.total_profit,
            roi: if self.total_wagered > Decimal::ZERO {
                money::to_f64(self.total_profit) / money::to_f64(self.total_wagered)
            } else {
                0.0
            },
            longest_win_streak: self.longest_win_streak,
            longest_loss_streak: self.longest_loss_streak,
            average_stake: if self.bets > 0 {
                self.total_wagered / Decimal::from(self.bets)
            } else {
                Decimal::ZERO
            },
            average_win: if self.wins > 0 {
                self.gross_wins / Decimal::from(self.wins)
            } else {
                Decimal::ZERO
            },
            average_loss: if self.losses > 0 {
                self.gross_losses / Decimal::from(self.losses)
            } else {
                Decimal::ZERO
            },
            profit_factor: if self.gross_losses > Decimal::ZERO {
                Some(money::to_f64(self.gross_wins) / money::to_f64(self.gross_losses))
            } else {
                None
            },
            ev_per_unit: if self.total_wagered > Decimal::ZERO {
                money::to_f64(self.total_profit) / money::to_f64(self.total_wagered)
            } else {
                0.0
            },
        }
    }

    pub fn risk(&self, bankroll: Decimal) -> RiskReport {
        let variance = if self.bets > 1 {
            self.m2_profit / (self.bets - 1) as f64
        } else {
            0.0
        };
        let current_drawdown = match self.peak_balance {
            Some(peak) => (peak - self.last_balance).max(Decimal::ZERO),
            None => Decimal::ZERO,
        };
        RiskReport {
            max_drawdown: self.max_drawdown,
            max_drawdown_pct: self.max_drawdown_pct,
            current_drawdown,
            profit_variance: variance,
            profit_std_dev: variance.sqrt(),
            risk_of_ruin: self.risk_of_ruin(bankroll),
            suggested_bankroll: self.max_drawdown * dec!(10),
        }
    }

    /// `((1-p)/p)^(bankroll/avg_stake)`, clamped. A crude random-walk bound
    /// that treats each bet as an even-money coin with the observed rate.
    fn risk_of_ruin(&self, bankroll: Decimal) -> f64 {
        if self.bets == 0 {
            return 1.0;
        }
        let p = self.wins as f64 / self.bets as f64;
        if p <= 0.0 {
            return 1.0;
        }
        if p >= 1.0 {
            return 0.0;
        }
        let avg_stake = money::to_f64(self.total_wagered) / self.bets as f64;
        if avg_stake <= 0.0 {
            return 0.0;
        }
        let units = (money::to_f64(bankroll) / avg_stake).clamp(0.0, 10_000.0);
        let ratio = (1.0 - p) / p;
        ratio.powf(units).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::{BetSide, BetSpec};

    fn result(won: bool, stake: Decimal, profit: Decimal, balance: Decimal) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(stake, dec!(50), BetSide::High),
            roll: dec!(0),
            won,
            profit,
            balance_after: balance,
            fairness: None,
        }
    }

    #[test]
    fn counts_streaks_and_averages() {
        let mut acc = MetricsAccumulator::new();
        acc.record(&result(true, dec!(1), dec!(0.94), dec!(100.94)));
        acc.record(&result(true, dec!(1), dec!(0.94), dec!(101.88)));
        acc.record(&result(false, dec!(2), dec!(-2), dec!(99.88)));

        let perf = acc.performance();
        assert_eq!(perf.total_bets, 3);
        assert_eq!(perf.wins, 2);
        assert_eq!(perf.longest_win_streak, 2);
        assert_eq!(perf.longest_loss_streak, 1);
        assert_eq!(perf.total_wagered, dec!(4));
        assert_eq!(perf.profit, dec!(-0.12));
        assert_eq!(perf.average_stake, dec!(4) / dec!(3));
        assert_eq!(perf.average_win, dec!(0.94));
        assert_eq!(perf.average_loss, dec!(2));
        let pf = perf.profit_factor.unwrap();
        assert!((pf - 0.94).abs() < 1e-9);
    }

    #[test]
    fn drawdown_tracks_peak_and_trough() {
        let mut acc = MetricsAccumulator::new();
        acc.record(&result(true, dec!(1), dec!(10), dec!(110)));
        acc.record(&result(false, dec!(1), dec!(-30), dec!(80)));
        acc.record(&result(true, dec!(1), dec!(5), dec!(85)));
        acc.record(&result(false, dec!(1), dec!(-10), dec!(75)));

        let risk = acc.risk(dec!(100));
        assert_eq!(risk.max_drawdown, dec!(35));
        assert!((risk.max_drawdown_pct - 35.0 / 110.0).abs() < 1e-9);
        assert_eq!(risk.current_drawdown, dec!(35));
        assert_eq!(risk.suggested_bankroll, dec!(350));
    }

    #[test]
    fn ruin_is_clamped_and_sane() {
        let mut acc = MetricsAccumulator::new();
        for i in 0..10 {
            // 4 wins, 6 losses
            let won = i < 4;
            acc.record(&result(won, dec!(1), if won { dec!(1) } else { dec!(-1) }, dec!(100)));
        }
        let risk = acc.risk(dec!(10));
        assert!(risk.risk_of_ruin > 0.0 && risk.risk_of_ruin <= 1.0);

        // All losses: certain ruin.
        let mut acc = MetricsAccumulator::new();
        acc.record(&result(false, dec!(1), dec!(-1), dec!(99)));
        assert_eq!(acc.risk(dec!(10)).risk_of_ruin, 1.0);
    }

    /// profit(A ++ B) == profit(A) + profit(B)
    #[test]
    fn metric_linearity_over_concatenation() {
        let stream_a = vec![
            result(true, dec!(1), dec!(0.94), dec!(100.94)),
            result(false, dec!(1), dec!(-1), dec!(99.94)),
        ];
        let stream_b = vec![result(false, dec!(2), dec!(-2), dec!(97.94))];

        let mut acc_a = MetricsAccumulator::new();
        stream_a.iter().for_each(|r| acc_a.record(r));
        let mut acc_b = MetricsAccumulator::new();
        stream_b.iter().for_each(|r| acc_b.record(r));
        let mut acc_ab = MetricsAccumulator::new();
        stream_a.iter().chain(&stream_b).for_each(|r| acc_ab.record(r));

        assert_eq!(
            acc_ab.performance().profit,
            acc_a.performance().profit + acc_b.performance().profit
        );
    }
}
