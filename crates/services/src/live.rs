use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use dicebot_models::{
    money, ApiError, BetResult, BetSide, BetSpec, Currency, FairnessProof, RangeMode,
};

use crate::api::{DiceApi, FaucetClaim};

const DEFAULT_BASE_URL: &str = "https://duckdice.io/api";
const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_ATTEMPTS: u32 = 3;

/// HTTP client for the live dice service. It carries JSON to and from the
/// endpoints behind the [`DiceApi`] methods and retries transient failures
/// with exponential backoff; all betting policy lives in the engine.
pub struct LiveDiceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LiveDiceClient {
    pub fn new(api_key: String) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api_key={}", self.base_url, path, self.api_key)
    }

    /// POST with bounded retry on 429/5xx/transport errors. The
    /// idempotency key makes retried submissions safe to coalesce
    /// server-side.
    async fn post_with_retry<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            match self.post_once(path, body, idempotency_key).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < RETRY_ATTEMPTS => {
                    attempt += 1;
                    let pause = e
                        .retry_after()
                        .unwrap_or(RETRY_BASE * 2u32.saturating_pow(attempt - 1));
                    warn!("🌐 {path} attempt {attempt}/{RETRY_ATTEMPTS} failed ({e}), retrying");
                    tokio::time::sleep(pause).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<T, ApiError> {
        let mut request = self.http.post(self.url(path)).json(body);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Transient(format!("malformed response body: {e}")));
        }
        let body = response.text().await.unwrap_or_default();
        debug!("🌐 API error {status}: {body}");
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
                retry_after: RETRY_BASE,
            },
            StatusCode::PAYMENT_REQUIRED => ApiError::InsufficientFunds,
            s if s.is_server_error() => ApiError::Transient(format!("{status}: {body}")),
            _ => ApiError::Rejected {
                reason: format!("{status}: {body}"),
            },
        })
    }
}

#[derive(Debug, Serialize)]
struct PlayRequest<'a> {
    symbol: &'a str,
    amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_high: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<[u16; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_in: Option<bool>,
    faucet: bool,
}

#[derive(Debug, Deserialize)]
struct PlayResponse {
    bet: BetPayload,
    #[serde(default)]
    user: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetPayload {
    hash: String,
    number: u64,
    result: bool,
    profit: String,
    #[serde(default)]
    server_seed_hash: Option<String>,
    #[serde(default)]
    server_seed: Option<String>,
    #[serde(default)]
    client_seed: Option<String>,
    #[serde(default)]
    nonce: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaucetResponse {
    amount: String,
    #[serde(default)]
    next_claim_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CurrencyPayload {
    symbol: String,
}

impl LiveDiceClient {
    fn decode_bet(spec: BetSpec, payload: PlayResponse) -> Result<BetResult, ApiError> {
        let roll = match spec.kind {
            // Dice endpoints report the roll scaled by 1000.
            dicebot_models::BetKind::Dice { .. } => Decimal::new(payload.bet.number as i64, 3),
            dicebot_models::BetKind::Range { .. } => Decimal::from(payload.bet.number),
        };
        let profit = money::parse_amount(payload.bet.profit.trim_start_matches('-'))
            .map_err(|e| ApiError::Rejected {
                reason: format!("unparseable profit field: {e}"),
            })
            .map(|p| {
                if payload.bet.profit.starts_with('-') {
                    -p
                } else {
                    p
                }
            })?;
        let balance_after = payload
            .user
            .as_ref()
            .map(|u| money::parse_amount(&u.balance))
            .transpose()
            .map_err(|e| ApiError::Rejected {
                reason: format!("unparseable balance field: {e}"),
            })?
            .unwrap_or_default();
        let fairness = match (payload.bet.server_seed_hash, payload.bet.client_seed) {
            (Some(server_seed_hash), Some(client_seed)) => Some(FairnessProof {
                server_seed_hash,
                server_seed: payload.bet.server_seed,
                client_seed,
                nonce: payload.bet.nonce.unwrap_or(0),
            }),
            _ => None,
        };
        Ok(BetResult {
            bet_id: payload.bet.hash,
            timestamp: Utc::now(),
            spec,
            roll,
            won: payload.bet.result,
            profit,
            balance_after,
            fairness,
        })
    }
}

#[async_trait]
impl DiceApi for LiveDiceClient {
    async fn place_dice(
        &self,
        currency: &Currency,
        stake: Decimal,
        chance: Decimal,
        side: BetSide,
        faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError> {
        let request = PlayRequest {
            symbol: currency.as_str(),
            amount: money::format_amount(stake),
            chance: Some(chance.to_string()),
            is_high: Some(side == BetSide::High),
            range: None,
            range_in: None,
            faucet,
        };
        let response: PlayResponse = self
            .post_with_retry("play", &request, Some(idempotency_key))
            .await?;
        Self::decode_bet(BetSpec::dice(stake, chance, side), response)
    }

    async fn place_range(
        &self,
        currency: &Currency,
        stake: Decimal,
        low: u16,
        high: u16,
        mode: RangeMode,
        faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError> {
        let request = PlayRequest {
            symbol: currency.as_str(),
            amount: money::format_amount(stake),
            chance: None,
            is_high: None,
            range: Some([low, high]),
            range_in: Some(mode == RangeMode::In),
            faucet,
        };
        let response: PlayResponse = self
            .post_with_retry("play-range", &request, Some(idempotency_key))
            .await?;
        Self::decode_bet(BetSpec::range(stake, low, high, mode), response)
    }

    async fn balance(&self, currency: &Currency) -> Result<Decimal, ApiError> {
        #[derive(Debug, Deserialize)]
        struct BalancePayload {
            main: String,
        }
        let payload: BalancePayload = self
            .get(&format!("balances/{}", currency.as_str()))
            .await?;
        money::parse_amount(&payload.main).map_err(|e| ApiError::Rejected {
            reason: format!("unparseable balance: {e}"),
        })
    }

    async fn claim_faucet(&self, currency: &Currency) -> Result<FaucetClaim, ApiError> {
        #[derive(Serialize)]
        struct ClaimRequest<'a> {
            symbol: &'a str,
        }
        let payload: FaucetResponse = self
            .post_with_retry(
                "faucet",
                &ClaimRequest {
                    symbol: currency.as_str(),
                },
                None,
            )
            .await?;
        let amount = money::parse_amount(&payload.amount).map_err(|e| ApiError::Rejected {
            reason: format!("unparseable faucet amount: {e}"),
        })?;
        Ok(FaucetClaim {
            amount,
            next_claim_at: payload.next_claim_at,
        })
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, ApiError> {
        let payload: Vec<CurrencyPayload> = self.get("currencies").await?;
        Ok(payload
            .into_iter()
            .map(|c| Currency::new(&c.symbol))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_a_winning_dice_bet() {
        let response = PlayResponse {
            bet: BetPayload {
                hash: "abc123".into(),
                number: 55_123,
                result: true,
                profit: "0.00000094".into(),
                server_seed_hash: Some("sh".into()),
                server_seed: None,
                client_seed: Some("cs".into()),
                nonce: Some(7),
            },
            user: Some(UserPayload {
                balance: "1.00000094".into(),
            }),
        };
        let spec = BetSpec::dice(dec!(0.000001), dec!(49.5), BetSide::High);
        let result = LiveDiceClient::decode_bet(spec, response).unwrap();
        assert_eq!(result.roll, dec!(55.123));
        assert!(result.won);
        assert_eq!(result.profit, dec!(0.00000094));
        assert_eq!(result.balance_after, dec!(1.00000094));
        let fairness = result.fairness.unwrap();
        assert_eq!(fairness.nonce, 7);
        assert!(fairness.server_seed.is_none());
    }

    #[test]
    fn decodes_negative_profit() {
        let response = PlayResponse {
            bet: BetPayload {
                hash: "abc".into(),
                number: 10,
                result: false,
                profit: "-0.00000100".into(),
                server_seed_hash: None,
                server_seed: None,
                client_seed: None,
                nonce: None,
            },
            user: None,
        };
        let spec = BetSpec::dice(dec!(0.000001), dec!(49.5), BetSide::High);
        let result = LiveDiceClient::decode_bet(spec, response).unwrap();
        assert_eq!(result.profit, dec!(-0.000001));
        assert!(result.fairness.is_none());
    }
}
