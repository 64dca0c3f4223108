//! Shared parameter specs and helpers used across the catalog.

use dicebot_models::{BetSide, ParamKind, ParamSpec, ParamValue, Params, StrategyError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `base` stake parameter shared by most dice strategies.
pub fn base_param(default: Decimal) -> ParamSpec {
    ParamSpec::decimal(
        "base",
        default,
        Some(Decimal::ZERO),
        None,
        "Base stake in currency units",
    )
}

/// `chance` win-probability parameter, default 49.5%.
pub fn chance_param() -> ParamSpec {
    ParamSpec::chance("chance", dec!(49.5), "Win probability in percent, (0, 99]")
}

/// `side` parameter, textual `high`/`low`.
pub fn side_param() -> ParamSpec {
    ParamSpec {
        name: "side",
        kind: ParamKind::Text,
        default: ParamValue::Text("high".to_string()),
        min: None,
        max: None,
        description: "Bet side: high or low",
    }
}

/// Parse the `side` parameter into a [`BetSide`].
pub fn parse_side(params: &Params) -> Result<BetSide, StrategyError> {
    match params.text("side")?.to_lowercase().as_str() {
        "high" | "h" | "over" => Ok(BetSide::High),
        "low" | "l" | "under" => Ok(BetSide::Low),
        other => Err(StrategyError::bad_parameter(
            "side",
            format!("'{other}' is neither high nor low"),
        )),
    }
}

/// Deterministic per-tick RNG: re-seeded from `(seed, tick)` on every call
/// so strategies that need randomness stay pure with respect to their
/// context and private state.
pub fn tick_rng(seed: u64, tick: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(tick))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    #[test]
    fn side_parses_both_directions() {
        let schema = vec![side_param()];
        let mut raw = HashMap::new();
        raw.insert("side".to_string(), "LOW".to_string());
        let params = Params::parse(&schema, &raw).unwrap();
        assert_eq!(parse_side(&params).unwrap(), BetSide::Low);
    }

    #[test]
    fn tick_rng_is_reproducible() {
        let a: u32 = tick_rng(7, 42).gen_range(0..10_000);
        let b: u32 = tick_rng(7, 42).gen_range(0..10_000);
        assert_eq!(a, b);
    }
}
