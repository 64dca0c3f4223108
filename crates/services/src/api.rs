use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dicebot_models::{ApiError, BetResult, BetSide, Currency, RangeMode};

/// One successful faucet claim. `next_claim_at` comes straight from the
/// service and is the only authority on the claim schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct FaucetClaim {
    pub amount: Decimal,
    pub next_claim_at: Option<DateTime<Utc>>,
}

/// The dice service as the engine sees it. The simulator and the live HTTP
/// client both implement this; the engine does not care which one it got.
///
/// Idempotency keys are opaque tokens: submitting the same key twice within
/// a session must yield at most one accepted bet.
#[async_trait]
pub trait DiceApi: Send + Sync {
    async fn place_dice(
        &self,
        currency: &Currency,
        stake: Decimal,
        chance: Decimal,
        side: BetSide,
        faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError>;

    #[allow(clippy::too_many_arguments)]
    async fn place_range(
        &self,
        currency: &Currency,
        stake: Decimal,
        low: u16,
        high: u16,
        mode: RangeMode,
        faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError>;

    async fn balance(&self, currency: &Currency) -> Result<Decimal, ApiError>;

    /// Optional: simulators without a configured faucet return
    /// [`ApiError::FaucetUnavailable`].
    async fn claim_faucet(&self, currency: &Currency) -> Result<FaucetClaim, ApiError>;

    async fn list_currencies(&self) -> Result<Vec<Currency>, ApiError>;
}
