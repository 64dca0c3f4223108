use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::BotError;
use crate::money::Currency;

/// Where bets go: the in-process simulator, or the live service's main or
/// faucet wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Simulation,
    LiveMain,
    LiveFaucet,
}

impl SessionMode {
    pub fn is_live(self) -> bool {
        matches!(self, Self::LiveMain | Self::LiveFaucet)
    }

    pub fn uses_faucet_wallet(self) -> bool {
        self == Self::LiveFaucet
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Simulation => "simulation",
            Self::LiveMain => "live-main",
            Self::LiveFaucet => "live-faucet",
        };
        f.write_str(label)
    }
}

impl FromStr for SessionMode {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, BotError> {
        match s {
            "simulation" => Ok(Self::Simulation),
            "live-main" => Ok(Self::LiveMain),
            "live-faucet" => Ok(Self::LiveFaucet),
            other => Err(BotError::Config(format!("unknown mode '{other}'"))),
        }
    }
}

/// User-configured limits checked before and after every bet.
/// `stop_loss` and `take_profit` refer to session P/L, so a typical
/// stop-loss is negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopConditions {
    pub max_bets: Option<u64>,
    pub max_losses: Option<u64>,
    pub max_wins: Option<u64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Why a session ended. Variant order is the precedence order: when several
/// conditions hold in the same tick, the lowest-index one is reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// External `stop()` on the control channel.
    External,
    MaxBets,
    MaxLosses,
    MaxWins,
    StopLoss,
    TakeProfit,
    /// The strategy itself gave up (sequence finished, cap reached, ...).
    Strategy { detail: String },
    /// Validator rejection other than bankruptcy.
    Unreachable { detail: String },
    /// Balance can no longer cover the minimum stake.
    Bankrupt { detail: String },
    /// Terminal API failure, or retries exhausted.
    Api { detail: String },
}

impl StopReason {
    /// Precedence index; lower fires first.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::External => 0,
            Self::MaxBets => 1,
            Self::MaxLosses => 2,
            Self::MaxWins => 3,
            Self::StopLoss => 4,
            Self::TakeProfit => 5,
            Self::Strategy { .. } => 6,
            Self::Unreachable { .. } => 7,
            Self::Bankrupt { .. } => 7,
            Self::Api { .. } => 8,
        }
    }

    /// Short machine-readable tag for the store and the CLI.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::External => "external",
            Self::MaxBets => "max_bets",
            Self::MaxLosses => "max_losses",
            Self::MaxWins => "max_wins",
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::Strategy { .. } => "strategy",
            Self::Unreachable { .. } => "unreachable",
            Self::Bankrupt { .. } => "bankrupt",
            Self::Api { .. } => "api_error",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strategy { detail }
            | Self::Unreachable { detail }
            | Self::Bankrupt { detail }
            | Self::Api { detail } => write!(f, "{}: {detail}", self.tag()),
            _ => f.write_str(self.tag()),
        }
    }
}

/// One start-to-stop execution of the auto-bet engine. Immutable once
/// `end_time` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub mode: SessionMode,
    pub currency: Currency,
    pub strategy: String,
    pub params_json: serde_json::Value,
    pub starting_balance: Decimal,
    pub ending_balance: Option<Decimal>,
    pub stop_reason: Option<StopReason>,
    pub bet_count: u64,
    pub win_count: u64,
    pub profit: Decimal,
}

/// Emitted when a session transitions to Stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub stop_reason: StopReason,
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub starting_balance: Decimal,
    pub ending_balance: Decimal,
    pub profit: Decimal,
    pub total_wagered: Decimal,
    pub max_win_streak: u64,
    pub max_loss_streak: u64,
    pub duration: Duration,
}

impl SessionSummary {
    pub fn win_rate(&self) -> f64 {
        if self.bets == 0 {
            0.0
        } else {
            self.wins as f64 / self.bets as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order_matches_variant_order() {
        let external = StopReason::External;
        let stop_loss = StopReason::StopLoss;
        let api = StopReason::Api { detail: "x".into() };
        assert!(external.precedence() < stop_loss.precedence());
        assert!(stop_loss.precedence() < api.precedence());
    }

    #[test]
    fn mode_parses_cli_names() {
        assert_eq!("simulation".parse::<SessionMode>().unwrap(), SessionMode::Simulation);
        assert_eq!("live-faucet".parse::<SessionMode>().unwrap(), SessionMode::LiveFaucet);
        assert!("live".parse::<SessionMode>().is_err());
    }

    #[test]
    fn stop_reason_serde_round_trips() {
        let reason = StopReason::Bankrupt {
            detail: "balance 0.00000003 < min_bet 0.00000010".into(),
        };
        let json = serde_json::to_string(&reason).unwrap();
        let back: StopReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reason);
    }
}
