use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use dicebot_models::{money, BetKind, BetSpec, RejectReason};

/// Everything the validator needs to judge a proposal. Pure data in, pure
/// data out; the engine owns all I/O.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub balance: Decimal,
    pub min_bet: Decimal,
    pub min_profit: Decimal,
    pub house_edge: Decimal,
    /// Highest win chance the service accepts; the shrink rule clamps here.
    pub chance_ceiling: Decimal,
}

/// How a proposal was changed on its way to the API. These are warnings,
/// not errors: each one is journaled and surfaced to the user, because a
/// silently adjusted bet would misstate what was risked.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "adjustment", rename_all = "snake_case")]
pub enum Adjustment {
    StakeFloored { from: Decimal, to: Decimal },
    StakeCapped { from: Decimal, to: Decimal },
    ChanceShrunk { from: Decimal, to: Decimal },
    StakeGrown { from: Decimal, to: Decimal },
    StakeRounded { from: Decimal, to: Decimal },
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StakeFloored { from, to } => {
                write!(f, "stake floored to minimum: {from} -> {to}")
            }
            Self::StakeCapped { from, to } => {
                write!(f, "stake capped to balance: {from} -> {to}")
            }
            Self::ChanceShrunk { from, to } => {
                write!(f, "chance shrunk for minimum profit: {from} -> {to}")
            }
            Self::StakeGrown { from, to } => {
                write!(f, "stake grown for minimum profit: {from} -> {to}")
            }
            Self::StakeRounded { from, to } => {
                write!(f, "stake rounded to currency precision: {from} -> {to}")
            }
        }
    }
}

/// Adjust `spec` until it satisfies balance, minimum-stake and
/// minimum-profit rules, or reject it. Rules apply in a fixed order:
/// floor, cap, minimum-profit (shrink chance, then grow stake), round.
pub fn validate(
    spec: &BetSpec,
    rules: &ValidationRules,
) -> Result<(BetSpec, Vec<Adjustment>), RejectReason> {
    let mut out = spec.clone();
    let mut adjustments = Vec::new();

    // 1. Floor the stake.
    if rules.min_bet > rules.balance {
        return Err(RejectReason::InsufficientBalance {
            balance: money::format_amount(rules.balance),
            min_bet: money::format_amount(rules.min_bet),
        });
    }
    if out.amount < rules.min_bet {
        adjustments.push(Adjustment::StakeFloored {
            from: out.amount,
            to: rules.min_bet,
        });
        out.amount = rules.min_bet;
    }

    // 2. Cap the stake at the balance.
    if out.amount > rules.balance {
        adjustments.push(Adjustment::StakeCapped {
            from: out.amount,
            to: rules.balance,
        });
        out.amount = rules.balance;
    }

    // 3. Ensure the win pays at least min_profit.
    if rules.min_profit > Decimal::ZERO {
        ensure_min_profit(&mut out, rules, &mut adjustments)?;
    }

    // 4. Round down to currency precision.
    let rounded = money::round_down(out.amount);
    if rounded != out.amount {
        adjustments.push(Adjustment::StakeRounded {
            from: out.amount,
            to: rounded,
        });
        out.amount = rounded;
    }
    if out.amount < rules.min_bet {
        return Err(RejectReason::BelowMinimumAfterRounding {
            stake: money::format_amount(out.amount),
            min_bet: money::format_amount(rules.min_bet),
        });
    }

    Ok((out, adjustments))
}

fn ensure_min_profit(
    out: &mut BetSpec,
    rules: &ValidationRules,
    adjustments: &mut Vec<Adjustment>,
) -> Result<(), RejectReason> {
    let profit = out.profit_on_win(rules.house_edge);
    if profit >= rules.min_profit {
        return Ok(());
    }

    // First preference: shrink the chance, which raises the multiplier
    // without risking more. Solves
    //   amount * (100/c') * (1 - e) - amount = min_profit.
    if let BetKind::Dice { chance, side } = out.kind {
        let chance_shrunk = dec!(100) * out.amount * (Decimal::ONE - rules.house_edge)
            / (out.amount + rules.min_profit);
        if chance_shrunk > Decimal::ZERO && chance_shrunk <= rules.chance_ceiling {
            adjustments.push(Adjustment::ChanceShrunk {
                from: chance,
                to: chance_shrunk,
            });
            out.kind = BetKind::Dice {
                chance: chance_shrunk,
                side,
            };
            return Ok(());
        }
    }

    // Second preference: keep the odds, raise the stake. Solves
    //   amount' * (mult - 1) = min_profit.
    let net_multiplier = out.payout_multiplier(rules.house_edge) - Decimal::ONE;
    if net_multiplier > Decimal::ZERO {
        let grown = rules.min_profit / net_multiplier;
        if grown <= rules.balance {
            adjustments.push(Adjustment::StakeGrown {
                from: out.amount,
                to: grown,
            });
            out.amount = grown;
            return Ok(());
        }
    }

    Err(RejectReason::UnreachableMinProfit {
        min_profit: money::format_amount(rules.min_profit),
        balance: money::format_amount(rules.balance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicebot_models::{BetSide, RangeMode};
    use proptest::prelude::*;

    fn rules(balance: Decimal, min_bet: Decimal, min_profit: Decimal) -> ValidationRules {
        ValidationRules {
            balance,
            min_bet,
            min_profit,
            house_edge: dec!(0.03),
            chance_ceiling: dec!(98),
        }
    }

    #[test]
    fn floors_small_stakes_and_rejects_broke_sessions() {
        let spec = BetSpec::dice(dec!(0.1), dec!(50), BetSide::High);
        let (out, adj) = validate(&spec, &rules(dec!(10), dec!(1), dec!(0))).unwrap();
        assert_eq!(out.amount, dec!(1));
        assert!(matches!(adj[0], Adjustment::StakeFloored { .. }));

        let err = validate(&spec, &rules(dec!(0.5), dec!(1), dec!(0))).unwrap_err();
        assert!(matches!(err, RejectReason::InsufficientBalance { .. }));
    }

    #[test]
    fn caps_stake_at_balance() {
        let spec = BetSpec::dice(dec!(50), dec!(50), BetSide::High);
        let (out, adj) = validate(&spec, &rules(dec!(10), dec!(1), dec!(0))).unwrap();
        assert_eq!(out.amount, dec!(10));
        assert!(matches!(adj[0], Adjustment::StakeCapped { .. }));
    }

    #[test]
    fn min_profit_shrinks_chance_first() {
        // balance=10, min_bet=1, min_profit=5, amount=1 at 50%:
        // c' = 100*1*0.97/(1+5) = 16.1666...
        let spec = BetSpec::dice(dec!(1), dec!(50), BetSide::High);
        let (out, adj) = validate(&spec, &rules(dec!(10), dec!(1), dec!(5))).unwrap();
        match out.kind {
            BetKind::Dice { chance, .. } => {
                let expected = dec!(97) / dec!(6);
                assert!((chance - expected).abs() < dec!(0.0001), "got {chance}");
            }
            BetKind::Range { .. } => panic!("kind changed"),
        }
        assert!(adj
            .iter()
            .any(|a| matches!(a, Adjustment::ChanceShrunk { .. })));
        // The adjusted spec now clears the profit requirement.
        assert!(out.profit_on_win(dec!(0.03)) >= dec!(4.9999));
    }

    #[test]
    fn min_profit_grows_stake_when_chance_cannot_shrink() {
        // Range bets have no chance to shrink; the stake must grow.
        let spec = BetSpec::range(dec!(1), 0, 4999, RangeMode::In);
        let (out, adj) = validate(&spec, &rules(dec!(100), dec!(1), dec!(5))).unwrap();
        assert!(adj
            .iter()
            .any(|a| matches!(a, Adjustment::StakeGrown { .. })));
        assert!(out.profit_on_win(dec!(0.03)) >= dec!(4.99));
    }

    #[test]
    fn unreachable_profit_rejects() {
        // Tiny balance, huge profit requirement, chance already shrunk past
        // the point where growing the stake fits the balance.
        let mut r = rules(dec!(1), dec!(0.1), dec!(1000));
        r.chance_ceiling = dec!(0.05);
        let spec = BetSpec::dice(dec!(1), dec!(50), BetSide::High);
        let err = validate(&spec, &r).unwrap_err();
        assert!(matches!(err, RejectReason::UnreachableMinProfit { .. }));
    }

    #[test]
    fn rounds_down_to_currency_precision() {
        let spec = BetSpec::dice(dec!(1.0000000099), dec!(50), BetSide::High);
        let (out, adj) = validate(&spec, &rules(dec!(10), dec!(0.5), dec!(0))).unwrap();
        assert_eq!(out.amount, dec!(1));
        assert!(adj
            .iter()
            .any(|a| matches!(a, Adjustment::StakeRounded { .. })));
    }

    proptest! {
        /// If a spec passes at some balance it passes at any higher balance.
        #[test]
        fn monotone_in_balance(
            amount_units in 1u64..1_000_000,
            balance_units in 1u64..10_000_000,
            extra_units in 0u64..10_000_000,
            chance_pct in 1u32..99,
        ) {
            let spec = BetSpec::dice(
                Decimal::new(amount_units as i64, 4),
                Decimal::from(chance_pct),
                BetSide::High,
            );
            let balance = Decimal::new(balance_units as i64, 4);
            let richer = balance + Decimal::new(extra_units as i64, 4);
            let base = rules(balance, dec!(0.0001), dec!(0.001));
            if validate(&spec, &base).is_ok() {
                let wealthy = rules(richer, dec!(0.0001), dec!(0.001));
                prop_assert!(validate(&spec, &wealthy).is_ok());
            }
        }
    }
}
