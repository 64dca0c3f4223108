use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::bet::BetResult;
use crate::error::StrategyError;
use crate::money::Currency;

/// How hard a strategy can hit the bankroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🟠",
            Self::Extreme => "🔴",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        };
        f.write_str(label)
    }
}

/// Static description of a catalog entry, shown by `strategies`/`show`.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyMetadata {
    pub name: &'static str,
    pub summary: &'static str,
    pub risk_level: RiskLevel,
    pub bankroll_hint: &'static str,
    pub volatility: &'static str,
    pub time_to_profit: &'static str,
    pub recommended_audience: &'static str,
    pub pros: &'static [&'static str],
    pub cons: &'static [&'static str],
    pub tips: &'static [&'static str],
    pub params: Vec<ParamSpec>,
}

/// Kinds a strategy parameter can take. `Chance` is a decimal constrained
/// to the (0, 99] win-probability range on top of any schema bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Decimal,
    Integer,
    Boolean,
    Chance,
    Text,
}

/// A parsed, schema-checked parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Decimal(Decimal),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Schema entry for one parameter: CLI wire form stays `key=value` strings,
/// parsing happens once at strategy init.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn decimal(
        name: &'static str,
        default: Decimal,
        min: Option<Decimal>,
        max: Option<Decimal>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Decimal,
            default: ParamValue::Decimal(default),
            min,
            max,
            description,
        }
    }

    pub fn chance(name: &'static str, default: Decimal, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Chance,
            default: ParamValue::Decimal(default),
            min: None,
            max: None,
            description,
        }
    }

    pub fn integer(
        name: &'static str,
        default: i64,
        min: Option<i64>,
        max: Option<i64>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            default: ParamValue::Integer(default),
            min: min.map(Decimal::from),
            max: max.map(Decimal::from),
            description,
        }
    }

    pub fn boolean(name: &'static str, default: bool, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Boolean,
            default: ParamValue::Boolean(default),
            min: None,
            max: None,
            description,
        }
    }

    fn parse(&self, raw: &str) -> Result<ParamValue, StrategyError> {
        let bad = |reason: String| StrategyError::BadParameter {
            field: self.name.to_string(),
            reason,
        };
        let value = match self.kind {
            ParamKind::Decimal | ParamKind::Chance => {
                let v = Decimal::from_str(raw)
                    .map_err(|e| bad(format!("'{raw}' is not a decimal: {e}")))?;
                ParamValue::Decimal(v)
            }
            ParamKind::Integer => {
                let v = raw
                    .parse::<i64>()
                    .map_err(|e| bad(format!("'{raw}' is not an integer: {e}")))?;
                ParamValue::Integer(v)
            }
            ParamKind::Boolean => {
                let v = match raw.to_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => true,
                    "false" | "no" | "0" | "off" => false,
                    other => return Err(bad(format!("'{other}' is not a boolean"))),
                };
                ParamValue::Boolean(v)
            }
            ParamKind::Text => ParamValue::Text(raw.to_string()),
        };
        self.check(&value)?;
        Ok(value)
    }

    fn check(&self, value: &ParamValue) -> Result<(), StrategyError> {
        let bad = |reason: String| StrategyError::BadParameter {
            field: self.name.to_string(),
            reason,
        };
        let numeric = match value {
            ParamValue::Decimal(v) => Some(*v),
            ParamValue::Integer(v) => Some(Decimal::from(*v)),
            _ => None,
        };
        if let Some(v) = numeric {
            if self.kind == ParamKind::Chance && (v <= Decimal::ZERO || v > Decimal::from(99)) {
                return Err(bad(format!("chance {v} outside (0, 99]")));
            }
            if let Some(min) = self.min {
                if v < min {
                    return Err(bad(format!("{v} below minimum {min}")));
                }
            }
            if let Some(max) = self.max {
                if v > max {
                    return Err(bad(format!("{v} above maximum {max}")));
                }
            }
        }
        Ok(())
    }
}

/// Typed parameter bindings after schema validation. Every schema key is
/// present (defaults fill the gaps), unknown keys never survive parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params(HashMap<String, ParamValue>);

impl Params {
    /// Validate raw `key=value` bindings against `schema`. Unknown keys are
    /// rejected, missing keys take their schema default.
    pub fn parse(
        schema: &[ParamSpec],
        raw: &HashMap<String, String>,
    ) -> Result<Self, StrategyError> {
        for key in raw.keys() {
            if !schema.iter().any(|spec| spec.name == key) {
                return Err(StrategyError::BadParameter {
                    field: key.clone(),
                    reason: "unknown parameter".into(),
                });
            }
        }
        let mut values = HashMap::with_capacity(schema.len());
        for spec in schema {
            let value = match raw.get(spec.name) {
                Some(text) => spec.parse(text)?,
                None => {
                    spec.check(&spec.default)?;
                    spec.default.clone()
                }
            };
            values.insert(spec.name.to_string(), value);
        }
        Ok(Self(values))
    }

    pub fn decimal(&self, name: &str) -> Result<Decimal, StrategyError> {
        match self.0.get(name) {
            Some(ParamValue::Decimal(v)) => Ok(*v),
            Some(ParamValue::Integer(v)) => Ok(Decimal::from(*v)),
            _ => Err(StrategyError::bad_parameter(name, "expected a decimal")),
        }
    }

    pub fn integer(&self, name: &str) -> Result<i64, StrategyError> {
        match self.0.get(name) {
            Some(ParamValue::Integer(v)) => Ok(*v),
            _ => Err(StrategyError::bad_parameter(name, "expected an integer")),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, StrategyError> {
        match self.0.get(name) {
            Some(ParamValue::Boolean(v)) => Ok(*v),
            _ => Err(StrategyError::bad_parameter(name, "expected a boolean")),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, StrategyError> {
        match self.0.get(name) {
            Some(ParamValue::Text(v)) => Ok(v),
            _ => Err(StrategyError::bad_parameter(name, "expected text")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }
}

/// Mutable session state the engine hands to a strategy every tick. The
/// engine is the only writer; strategies read it and keep their own private
/// state beside it.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub currency: Currency,
    pub house_edge: Decimal,
    pub starting_balance: Decimal,
    pub balance: Decimal,
    /// Highest balance seen this session, for drawdown-aware strategies.
    pub peak_balance: Decimal,
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_wagered: Decimal,
    pub total_profit: Decimal,
    /// Signed: positive while winning, negative while losing.
    pub streak: i64,
    pub max_win_streak: u64,
    pub max_loss_streak: u64,
    /// Last N results, N declared by the strategy.
    pub history: VecDeque<BetResult>,
    history_cap: usize,
    /// Monotonic session clock, advanced by the engine's injected clock.
    pub elapsed: Duration,
    /// When the faucet next allows a claim; `None` if the API never told us.
    pub next_faucet_claim: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl StrategyContext {
    pub fn new(
        currency: Currency,
        house_edge: Decimal,
        starting_balance: Decimal,
        history_cap: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            currency,
            house_edge,
            starting_balance,
            balance: starting_balance,
            peak_balance: starting_balance,
            bets: 0,
            wins: 0,
            losses: 0,
            total_wagered: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            streak: 0,
            max_win_streak: 0,
            max_loss_streak: 0,
            history: VecDeque::with_capacity(history_cap),
            history_cap,
            elapsed: Duration::ZERO,
            next_faucet_claim: None,
            now,
        }
    }

    /// Fold one executed bet into the session counters.
    pub fn record(&mut self, result: &BetResult) {
        self.bets += 1;
        self.total_wagered += result.spec.amount;
        self.total_profit += result.profit;
        self.balance = result.balance_after;
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
        if result.won {
            self.wins += 1;
            self.streak = if self.streak > 0 { self.streak + 1 } else { 1 };
            self.max_win_streak = self.max_win_streak.max(self.streak as u64);
        } else {
            self.losses += 1;
            self.streak = if self.streak < 0 { self.streak - 1 } else { -1 };
            self.max_loss_streak = self.max_loss_streak.max(self.streak.unsigned_abs());
        }
        if self.history_cap > 0 {
            if self.history.len() == self.history_cap {
                self.history.pop_front();
            }
            self.history.push_back(result.clone());
        }
    }

    /// Current drawdown from the session peak, never negative.
    pub fn drawdown(&self) -> Decimal {
        (self.peak_balance - self.balance).max(Decimal::ZERO)
    }

    pub fn faucet_claimable(&self) -> bool {
        match self.next_faucet_claim {
            Some(at) => self.now >= at,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bet::{BetSide, BetSpec};
    use rust_decimal_macros::dec;

    fn result(won: bool, profit: Decimal, balance_after: Decimal) -> BetResult {
        BetResult {
            bet_id: "t".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(50), BetSide::High),
            roll: dec!(50.001),
            won,
            profit,
            balance_after,
            fairness: None,
        }
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let schema = vec![ParamSpec::decimal("base", dec!(1), None, None, "base stake")];
        let mut raw = HashMap::new();
        raw.insert("bse".to_string(), "2".to_string());
        let err = Params::parse(&schema, &raw).unwrap_err();
        assert!(matches!(err, StrategyError::BadParameter { field, .. } if field == "bse"));
    }

    #[test]
    fn parse_applies_defaults_and_ranges() {
        let schema = vec![
            ParamSpec::decimal("base", dec!(1), Some(dec!(0.1)), Some(dec!(10)), ""),
            ParamSpec::integer("steps", 5, Some(1), None, ""),
        ];
        let params = Params::parse(&schema, &HashMap::new()).unwrap();
        assert_eq!(params.decimal("base").unwrap(), dec!(1));
        assert_eq!(params.integer("steps").unwrap(), 5);

        let mut raw = HashMap::new();
        raw.insert("base".to_string(), "100".to_string());
        assert!(Params::parse(&schema, &raw).is_err());
    }

    #[test]
    fn chance_kind_enforces_probability_range() {
        let schema = vec![ParamSpec::chance("chance", dec!(49.5), "")];
        let mut raw = HashMap::new();
        raw.insert("chance".to_string(), "99.5".to_string());
        assert!(Params::parse(&schema, &raw).is_err());
        raw.insert("chance".to_string(), "0".to_string());
        assert!(Params::parse(&schema, &raw).is_err());
        raw.insert("chance".to_string(), "66".to_string());
        assert!(Params::parse(&schema, &raw).is_ok());
    }

    #[test]
    fn context_tracks_streaks_and_ring_buffer() {
        let mut ctx = StrategyContext::new(
            Currency::new("btc"),
            dec!(0.03),
            dec!(100),
            2,
            Utc::now(),
        );
        ctx.record(&result(false, dec!(-1), dec!(99)));
        ctx.record(&result(false, dec!(-1), dec!(98)));
        assert_eq!(ctx.streak, -2);
        assert_eq!(ctx.max_loss_streak, 2);
        ctx.record(&result(true, dec!(0.94), dec!(98.94)));
        assert_eq!(ctx.streak, 1);
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.bets, 3);
        assert_eq!(ctx.total_profit, dec!(-1.06));
    }
}
