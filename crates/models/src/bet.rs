use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::money::Currency;

/// Which half of the number line a dice bet wins on.
///
/// High wins if `roll > 100 - chance`, low wins if `roll < chance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    High,
    Low,
}

impl BetSide {
    pub fn flipped(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }
}

/// Whether a range bet wins inside or outside the configured interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    In,
    Out,
}

/// The two mutually-exclusive bet shapes. A spec is either dice
/// (chance + side) or range (interval + mode) by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BetKind {
    Dice {
        /// Win probability in percent, rational in (0, 99].
        chance: Decimal,
        side: BetSide,
    },
    Range {
        /// Inclusive interval inside [0, 9999].
        low: u16,
        high: u16,
        mode: RangeMode,
    },
}

impl BetKind {
    /// Win probability in percent, identical for both shapes.
    pub fn win_chance_percent(&self) -> Decimal {
        match self {
            Self::Dice { chance, .. } => *chance,
            Self::Range { low, high, mode } => {
                let width = Decimal::from(high - low + 1);
                let inside = width / dec!(100);
                match mode {
                    RangeMode::In => inside,
                    RangeMode::Out => dec!(100) - inside,
                }
            }
        }
    }

    /// Whether `roll` satisfies this bet. Dice rolls carry three fractional
    /// digits; range rolls are integers in [0, 9999].
    pub fn wins(&self, roll: Decimal) -> bool {
        match self {
            Self::Dice { chance, side } => match side {
                BetSide::High => roll > dec!(100) - chance,
                BetSide::Low => roll < *chance,
            },
            Self::Range { low, high, mode } => {
                let lo = Decimal::from(*low);
                let hi = Decimal::from(*high);
                let inside = roll >= lo && roll <= hi;
                match mode {
                    RangeMode::In => inside,
                    RangeMode::Out => !inside,
                }
            }
        }
    }
}

/// A strategy's proposal for the next bet. Constructed every tick,
/// discarded after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSpec {
    pub amount: Decimal,
    #[serde(flatten)]
    pub kind: BetKind,
    /// Override the session currency for this one bet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
}

impl BetSpec {
    pub fn dice(amount: Decimal, chance: Decimal, side: BetSide) -> Self {
        Self {
            amount,
            kind: BetKind::Dice { chance, side },
            currency: None,
        }
    }

    pub fn range(amount: Decimal, low: u16, high: u16, mode: RangeMode) -> Self {
        Self {
            amount,
            kind: BetKind::Range { low, high, mode },
            currency: None,
        }
    }

    /// Payout multiplier after the house takes its cut:
    /// `(100 / chance) * (1 - edge)`.
    pub fn payout_multiplier(&self, house_edge: Decimal) -> Decimal {
        let chance = self.kind.win_chance_percent();
        if chance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        dec!(100) / chance * (Decimal::ONE - house_edge)
    }

    /// Amount credited on a win (stake included).
    pub fn payout_on_win(&self, house_edge: Decimal) -> Decimal {
        self.amount * self.payout_multiplier(house_edge)
    }

    /// Net profit on a win: `stake * (multiplier - 1)`.
    pub fn profit_on_win(&self, house_edge: Decimal) -> Decimal {
        self.payout_on_win(house_edge) - self.amount
    }
}

/// Seeds and nonce committing the house to a roll before it happens.
/// `server_seed` stays `None` until the house rotates and reveals it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessProof {
    pub server_seed_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    pub client_seed: String,
    pub nonce: u64,
}

/// Outcome of one executed bet, as the API layer reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetResult {
    pub bet_id: String,
    pub timestamp: DateTime<Utc>,
    pub spec: BetSpec,
    /// 0.000..=99.999 for dice, integer in [0, 9999] for range.
    pub roll: Decimal,
    pub won: bool,
    /// Signed: `payout - stake` on a win, `-stake` on a loss.
    pub profit: Decimal,
    pub balance_after: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fairness: Option<FairnessProof>,
}
