use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};

use dicebot_models::{BetKind, BetResult};

/// Number of dice outcomes: rolls are `k / 1000` for `k` in `[0, 100000)`.
const DICE_SPAN: u32 = 100_000;
/// Range rolls are integers in `[0, 10000)`.
const RANGE_SPAN: u32 = 10_000;

/// Recompute a dice roll from the committed seeds.
///
/// The hash input is the literal concatenation
/// `server_seed || client_seed || ascii_decimal(nonce)`; the roll is the
/// first five hex characters of the SHA-256 digest taken mod 100000,
/// scaled to three fractional digits. Returns `(roll, full_hex_digest)`.
pub fn derive_roll(server_seed: &str, client_seed: &str, nonce: u64) -> (Decimal, String) {
    let digest = seed_digest(server_seed, client_seed, nonce);
    let k = leading_value(&digest) % DICE_SPAN;
    (Decimal::new(i64::from(k), 3), digest)
}

/// Range variant of [`derive_roll`]: same digest, integer outcome.
pub fn derive_range_roll(server_seed: &str, client_seed: &str, nonce: u64) -> (u32, String) {
    let digest = seed_digest(server_seed, client_seed, nonce);
    (leading_value(&digest) % RANGE_SPAN, digest)
}

fn seed_digest(server_seed: &str, client_seed: &str, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(server_seed.as_bytes());
    hasher.update(client_seed.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn leading_value(digest: &str) -> u32 {
    // The digest is lowercase hex by construction; five chars fit in u32.
    u32::from_str_radix(&digest[..5], 16).unwrap_or(0)
}

/// Outcome of checking one stored bet against its seeds.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Verified,
    Mismatch { expected: Decimal, stored: Decimal },
    /// The server seed has not been revealed (or was never recorded).
    MissingSeed,
}

/// Check a single stored result. A dice roll verifies when the recomputed
/// value is within 10^-3 of the stored one; range rolls must match exactly.
pub fn verify_result(result: &BetResult) -> Verification {
    let Some(fairness) = &result.fairness else {
        return Verification::MissingSeed;
    };
    let Some(server_seed) = &fairness.server_seed else {
        return Verification::MissingSeed;
    };

    let expected = match result.spec.kind {
        BetKind::Dice { .. } => {
            derive_roll(server_seed, &fairness.client_seed, fairness.nonce).0
        }
        BetKind::Range { .. } => Decimal::from(
            derive_range_roll(server_seed, &fairness.client_seed, fairness.nonce).0,
        ),
    };

    let ok = match result.spec.kind {
        BetKind::Dice { .. } => (expected - result.roll).abs() < dec!(0.001),
        BetKind::Range { .. } => expected == result.roll,
    };
    if ok {
        Verification::Verified
    } else {
        Verification::Mismatch {
            expected,
            stored: result.roll,
        }
    }
}

/// Aggregate verification over a bet stream.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub checked: u64,
    pub passed: u64,
    pub missing_seed: u64,
    pub failing_bet_ids: Vec<String>,
}

impl BatchReport {
    /// Pass rate over the bets that could actually be checked.
    pub fn pass_rate(&self) -> f64 {
        let verifiable = self.checked - self.missing_seed;
        if verifiable == 0 {
            0.0
        } else {
            self.passed as f64 / verifiable as f64
        }
    }
}

pub fn verify_batch<'a>(results: impl IntoIterator<Item = &'a BetResult>) -> BatchReport {
    let mut report = BatchReport::default();
    for result in results {
        report.checked += 1;
        match verify_result(result) {
            Verification::Verified => report.passed += 1,
            Verification::MissingSeed => report.missing_seed += 1,
            Verification::Mismatch { .. } => {
                report.failing_bet_ids.push(result.bet_id.clone());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dicebot_models::{BetSide, BetSpec, FairnessProof};

    #[test]
    fn known_vector_matches() {
        let (roll, digest) = derive_roll("test_server_seed_12345", "my_client_seed", 0);
        assert_eq!(&digest[..5], "363fb");
        assert_eq!(roll, dec!(22.203));
    }

    #[test]
    fn nonce_renders_as_plain_decimal() {
        // nonce 10 must hash as "10", not "0x0a" or zero-padded.
        let (a, _) = derive_roll("s", "c", 10);
        let mut hasher = Sha256::new();
        hasher.update(b"sc10");
        let manual = hex::encode(hasher.finalize());
        let k = u32::from_str_radix(&manual[..5], 16).unwrap() % 100_000;
        assert_eq!(a, Decimal::new(i64::from(k), 3));
    }

    fn stored(roll: Decimal, server_seed: Option<&str>) -> BetResult {
        BetResult {
            bet_id: "bet-1".into(),
            timestamp: Utc::now(),
            spec: BetSpec::dice(dec!(1), dec!(50), BetSide::High),
            roll,
            won: false,
            profit: dec!(-1),
            balance_after: dec!(99),
            fairness: Some(FairnessProof {
                server_seed_hash: "unused".into(),
                server_seed: server_seed.map(String::from),
                client_seed: "my_client_seed".into(),
                nonce: 0,
            }),
        }
    }

    #[test]
    fn verifies_and_catches_mismatches() {
        let good = stored(dec!(22.203), Some("test_server_seed_12345"));
        assert_eq!(verify_result(&good), Verification::Verified);

        let bad = stored(dec!(22.204), Some("test_server_seed_12345"));
        assert!(matches!(verify_result(&bad), Verification::Mismatch { .. }));

        let unrevealed = stored(dec!(22.203), None);
        assert_eq!(verify_result(&unrevealed), Verification::MissingSeed);
    }

    #[test]
    fn batch_collects_failures_and_rate() {
        let results = vec![
            stored(dec!(22.203), Some("test_server_seed_12345")),
            stored(dec!(99.999), Some("test_server_seed_12345")),
            stored(dec!(22.203), None),
        ];
        let report = verify_batch(&results);
        assert_eq!(report.checked, 3);
        assert_eq!(report.passed, 1);
        assert_eq!(report.missing_seed, 1);
        assert_eq!(report.failing_bet_ids, vec!["bet-1".to_string()]);
        assert!((report.pass_rate() - 0.5).abs() < f64::EPSILON);
    }
}
