use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BotError, Result};

/// Fractional digits carried by every wager and balance amount.
pub const SCALE: u32 = 8;

/// Smallest representable amount (one satoshi at 8 decimal places).
pub fn min_unit() -> Decimal {
    Decimal::new(1, SCALE)
}

/// Parse a textual amount losslessly, rejecting negatives and anything
/// finer than [`SCALE`].
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let value = Decimal::from_str(text.trim())
        .map_err(|e| BotError::Money(format!("'{text}' is not a decimal amount: {e}")))?;
    if value.is_sign_negative() {
        return Err(BotError::Money(format!("amount must be non-negative, got {value}")));
    }
    if value.scale() > SCALE {
        return Err(BotError::Money(format!(
            "amount {value} exceeds {SCALE} decimal places"
        )));
    }
    Ok(value.normalize())
}

/// Truncate an amount down to currency precision. Never rounds up, so a
/// capped stake can never exceed the balance it was capped to.
pub fn round_down(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero)
}

/// Render an amount with the full fixed scale, e.g. `0.00000010`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.1$}", amount, SCALE as usize)
}

/// Lossy float view, used only for statistics (never for balances).
pub fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// Short lower-case currency symbol (`btc`, `doge`, ...). Opaque to the
/// engine; only the API and the store care which one it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(BotError::Money("currency symbol must not be empty".into()));
        }
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_rejects_negative_and_overscaled() {
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("0.000000001").is_err());
        assert_eq!(parse_amount("0.00000001").unwrap(), dec!(0.00000001));
        assert_eq!(parse_amount("100").unwrap(), dec!(100));
    }

    #[test]
    fn round_down_truncates() {
        assert_eq!(round_down(dec!(1.234567899)), dec!(1.23456789));
        assert_eq!(round_down(dec!(0.999999999)), dec!(0.99999999));
    }

    #[test]
    fn format_is_fixed_scale() {
        assert_eq!(format_amount(dec!(0.0000001)), "0.00000010");
        assert_eq!(format_amount(dec!(1)), "1.00000000");
    }

    #[test]
    fn currency_is_lowercased() {
        assert_eq!(Currency::new("BTC").as_str(), "btc");
        assert_eq!("DOGE".parse::<Currency>().unwrap().as_str(), "doge");
    }

    proptest! {
        #[test]
        fn parse_format_round_trips(units in 0u64..u64::MAX / 2) {
            let amount = Decimal::new(units as i64, SCALE);
            let text = format_amount(amount);
            prop_assert_eq!(parse_amount(&text).unwrap(), amount.normalize());
        }

        #[test]
        fn round_down_never_increases(units in 0i64..i64::MAX / 2, scale in 0u32..12) {
            let amount = Decimal::new(units, scale.min(28));
            prop_assert!(round_down(amount) <= amount);
        }
    }
}
