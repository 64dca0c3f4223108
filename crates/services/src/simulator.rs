use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use dicebot_models::{
    money, ApiError, BetKind, BetResult, BetSide, BetSpec, Currency, FairnessProof, RangeMode,
    ReplayError,
};

use crate::api::{DiceApi, FaucetClaim};
use crate::clock::Clock;
use crate::verifier;

/// Configuration for one simulator instance.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub seed: u64,
    pub house_edge: Decimal,
    pub starting_balance: Decimal,
    pub currency: Currency,
    pub client_seed: String,
    /// Simulated faucet: amount per claim and the enforced claim interval.
    /// `None` disables the faucet, as on the live main wallet.
    pub faucet: Option<(Decimal, Duration)>,
    /// Historical replay: rolls are taken from this log instead of being
    /// drawn. Exhausting the log fails the bet with a replay error.
    pub replay_rolls: Option<Vec<Decimal>>,
}

impl SimulatorConfig {
    pub fn new(seed: u64, starting_balance: Decimal, currency: Currency) -> Self {
        Self {
            seed,
            house_edge: dec!(0.03),
            starting_balance,
            currency,
            client_seed: "dicebot-client".to_string(),
            faucet: None,
            replay_rolls: None,
        }
    }
}

struct SimState {
    server_seed: String,
    server_seed_hash: String,
    nonce: u64,
    balance: Decimal,
    bet_counter: u64,
    accepted: HashMap<String, BetResult>,
    replay: Option<VecDeque<Decimal>>,
    next_faucet_claim: Option<DateTime<Utc>>,
}

/// Deterministic in-process stand-in for the dice service.
///
/// Rolls come from the same provably-fair SHA-256 derivation the verifier
/// recomputes, with the server seed drawn from a seeded generator, so every
/// simulated bet carries a revealed seed and verifies bit-exactly. Given
/// the same seed and the same request sequence, two instances produce
/// identical result sequences.
pub struct DiceSimulator {
    config: SimulatorConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<SimState>,
}

impl DiceSimulator {
    pub fn new(config: SimulatorConfig, clock: Arc<dyn Clock>) -> Self {
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let server_seed: String = (&mut rng)
            .sample_iter(rand::distributions::Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();
        let server_seed_hash = hex::encode(Sha256::digest(server_seed.as_bytes()));
        let state = SimState {
            server_seed,
            server_seed_hash,
            nonce: 0,
            balance: config.starting_balance,
            bet_counter: 0,
            accepted: HashMap::new(),
            replay: config.replay_rolls.clone().map(VecDeque::from),
            next_faucet_claim: None,
        };
        Self {
            config,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn house_edge(&self) -> Decimal {
        self.config.house_edge
    }

    fn execute(&self, spec: BetSpec, idempotency_key: &str) -> Result<BetResult, ApiError> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(previous) = state.accepted.get(idempotency_key) {
            return Ok(previous.clone());
        }
        if spec.amount > state.balance {
            return Err(ApiError::InsufficientFunds);
        }

        let nonce = state.nonce;
        let (roll, replayed) = match &mut state.replay {
            Some(log) => (
                log.pop_front()
                    .ok_or(ApiError::Replay(ReplayError::OutOfData))?,
                true,
            ),
            None => {
                let drawn = match spec.kind {
                    BetKind::Dice { .. } => {
                        verifier::derive_roll(&state.server_seed, &self.config.client_seed, nonce)
                            .0
                    }
                    BetKind::Range { .. } => Decimal::from(
                        verifier::derive_range_roll(
                            &state.server_seed,
                            &self.config.client_seed,
                            nonce,
                        )
                        .0,
                    ),
                };
                (drawn, false)
            }
        };
        state.nonce += 1;

        let won = spec.kind.wins(roll);
        let payout = if won {
            money::round_down(spec.payout_on_win(self.config.house_edge))
        } else {
            Decimal::ZERO
        };
        let profit = payout - spec.amount;
        state.balance += profit;
        state.bet_counter += 1;

        let result = BetResult {
            bet_id: format!("sim-{}", state.bet_counter),
            timestamp: now,
            spec,
            roll,
            won,
            profit,
            balance_after: state.balance,
            // Replayed rolls were not derived from this instance's seeds,
            // so they carry no proof. Drawn rolls reveal the seed
            // immediately: the simulator is its own house and needs no
            // rotation step before stored sessions verify.
            fairness: (!replayed).then(|| FairnessProof {
                server_seed_hash: state.server_seed_hash.clone(),
                server_seed: Some(state.server_seed.clone()),
                client_seed: self.config.client_seed.clone(),
                nonce,
            }),
        };
        state
            .accepted
            .insert(idempotency_key.to_string(), result.clone());
        Ok(result)
    }
}

#[async_trait]
impl DiceApi for DiceSimulator {
    async fn place_dice(
        &self,
        _currency: &Currency,
        stake: Decimal,
        chance: Decimal,
        side: BetSide,
        _faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError> {
        self.execute(BetSpec::dice(stake, chance, side), idempotency_key)
    }

    async fn place_range(
        &self,
        _currency: &Currency,
        stake: Decimal,
        low: u16,
        high: u16,
        mode: RangeMode,
        _faucet: bool,
        idempotency_key: &str,
    ) -> Result<BetResult, ApiError> {
        if low > high || high > 9999 {
            return Err(ApiError::Rejected {
                reason: format!("invalid range [{low}, {high}]"),
            });
        }
        self.execute(BetSpec::range(stake, low, high, mode), idempotency_key)
    }

    async fn balance(&self, _currency: &Currency) -> Result<Decimal, ApiError> {
        Ok(self.state.lock().balance)
    }

    async fn claim_faucet(&self, _currency: &Currency) -> Result<FaucetClaim, ApiError> {
        let Some((amount, interval)) = self.config.faucet else {
            return Err(ApiError::FaucetUnavailable(
                "simulator has no faucet configured".to_string(),
            ));
        };
        let now = self.clock.now();
        let mut state = self.state.lock();
        if let Some(next) = state.next_faucet_claim {
            if now < next {
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                return Err(ApiError::RateLimited { retry_after: wait });
            }
        }
        state.balance += amount;
        let next = now
            + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        state.next_faucet_claim = Some(next);
        Ok(FaucetClaim {
            amount,
            next_claim_at: Some(next),
        })
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, ApiError> {
        Ok(vec![self.config.currency.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use crate::verifier::{verify_batch, verify_result, Verification};

    fn simulator(seed: u64) -> DiceSimulator {
        let config = SimulatorConfig::new(seed, dec!(100), Currency::new("btc"));
        DiceSimulator::new(config, Arc::new(VirtualClock::new()))
    }

    fn btc() -> Currency {
        Currency::new("btc")
    }

    #[tokio::test]
    async fn same_seed_same_results() {
        let a = simulator(42);
        let b = simulator(42);
        for i in 0..50 {
            let key = format!("k{i}");
            let ra = a
                .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, &key)
                .await
                .unwrap();
            let rb = b
                .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, &key)
                .await
                .unwrap();
            assert_eq!(ra.roll, rb.roll);
            assert_eq!(ra.balance_after, rb.balance_after);
        }
    }

    #[tokio::test]
    async fn different_seeds_diverge() {
        let a = simulator(1);
        let b = simulator(2);
        let mut same = true;
        for i in 0..10 {
            let key = format!("k{i}");
            let ra = a
                .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, &key)
                .await
                .unwrap();
            let rb = b
                .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, &key)
                .await
                .unwrap();
            if ra.roll != rb.roll {
                same = false;
            }
        }
        assert!(!same);
    }

    #[tokio::test]
    async fn balance_closure_holds_exactly() {
        let sim = simulator(7);
        let mut balance = dec!(100);
        for i in 0..200 {
            let key = format!("k{i}");
            let r = sim
                .place_dice(&btc(), dec!(0.5), dec!(33), BetSide::Low, false, &key)
                .await
                .unwrap();
            // balance_after = balance_before - stake + payout, no residue.
            let payout = if r.won {
                money::round_down(r.spec.payout_on_win(dec!(0.03)))
            } else {
                Decimal::ZERO
            };
            assert_eq!(r.balance_after, balance - dec!(0.5) + payout);
            balance = r.balance_after;
        }
    }

    #[tokio::test]
    async fn every_simulated_bet_verifies() {
        let sim = simulator(42);
        let mut results = Vec::new();
        for i in 0..100 {
            let key = format!("k{i}");
            let r = sim
                .place_dice(&btc(), dec!(0.1), dec!(50), BetSide::High, false, &key)
                .await
                .unwrap();
            assert_eq!(verify_result(&r), Verification::Verified);
            results.push(r);
        }
        let report = verify_batch(&results);
        assert_eq!(report.passed, 100);
        assert!((report.pass_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn idempotent_resubmission_returns_the_same_bet() {
        let sim = simulator(9);
        let first = sim
            .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, "dup")
            .await
            .unwrap();
        let second = sim
            .place_dice(&btc(), dec!(1), dec!(49.5), BetSide::High, false, "dup")
            .await
            .unwrap();
        assert_eq!(first, second);
        // Only one bet was accepted: the balance moved once.
        assert_eq!(
            sim.balance(&btc()).await.unwrap(),
            first.balance_after
        );
    }

    #[tokio::test]
    async fn insufficient_funds_and_bad_ranges_are_rejected() {
        let sim = simulator(3);
        let err = sim
            .place_dice(&btc(), dec!(1000), dec!(50), BetSide::High, false, "k")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientFunds));

        let err = sim
            .place_range(&btc(), dec!(1), 500, 400, RangeMode::In, false, "k2")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[tokio::test]
    async fn replay_mode_reads_the_log_then_runs_dry() {
        let mut config = SimulatorConfig::new(0, dec!(100), btc());
        config.replay_rolls = Some(vec![dec!(10.5), dec!(88)]);
        let sim = DiceSimulator::new(config, Arc::new(VirtualClock::new()));

        let r = sim
            .place_dice(&btc(), dec!(1), dec!(50), BetSide::Low, false, "a")
            .await
            .unwrap();
        assert_eq!(r.roll, dec!(10.5));
        assert!(r.won);
        let r = sim
            .place_dice(&btc(), dec!(1), dec!(50), BetSide::Low, false, "b")
            .await
            .unwrap();
        assert_eq!(r.roll, dec!(88));
        assert!(!r.won);

        let err = sim
            .place_dice(&btc(), dec!(1), dec!(50), BetSide::Low, false, "c")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Replay(ReplayError::OutOfData)));
    }

    #[tokio::test]
    async fn faucet_honours_its_own_schedule() {
        let mut config = SimulatorConfig::new(0, dec!(0), btc());
        config.faucet = Some((dec!(0.0001), Duration::from_secs(600)));
        let clock = Arc::new(VirtualClock::new());
        let sim = DiceSimulator::new(config, clock.clone());

        let claim = sim.claim_faucet(&btc()).await.unwrap();
        assert_eq!(claim.amount, dec!(0.0001));
        assert!(claim.next_claim_at.is_some());

        let err = sim.claim_faucet(&btc()).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { .. }));

        clock.sleep(Duration::from_secs(600)).await;
        assert!(sim.claim_faucet(&btc()).await.is_ok());

        let sim_no_faucet = simulator(0);
        let err = sim_no_faucet.claim_faucet(&btc()).await.unwrap_err();
        assert!(matches!(err, ApiError::FaucetUnavailable(_)));
    }
}
