use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("money error: {0}")]
    Money(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("journal error: {0}")]
    Journal(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("replay error: {0}")]
    Replay(ReplayError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Failures surfaced by any [`DiceApi`] implementation, live or simulated.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("transient api failure: {0}")]
    Transient(String),

    #[error("bet rejected: {reason}")]
    Rejected { reason: String },

    #[error("network failure: {0}")]
    Network(String),

    #[error("faucet unavailable: {0}")]
    FaucetUnavailable(String),

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl ApiError {
    /// Whether the engine may resubmit the same bet (same idempotency key).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient(_) | Self::Network(_)
        )
    }

    /// Suggested pause before the next attempt, if the server told us.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("bad parameter '{field}': {reason}")]
    BadParameter { field: String, reason: String },
}

impl StrategyError {
    pub fn bad_parameter(field: &str, reason: impl Into<String>) -> Self {
        Self::BadParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why the validator refused a proposed bet outright. Adjustments that keep
/// the bet alive are *not* errors and travel on the side-channel instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("insufficient balance: balance {balance} < min_bet {min_bet}")]
    InsufficientBalance { balance: String, min_bet: String },

    #[error("minimum profit {min_profit} unreachable at balance {balance}")]
    UnreachableMinProfit { min_profit: String, balance: String },

    #[error("stake {stake} fell below min_bet {min_bet} after rounding")]
    BelowMinimumAfterRounding { stake: String, min_bet: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("replay log exhausted")]
    OutOfData,
}
