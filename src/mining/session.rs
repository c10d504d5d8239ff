use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use thiserror::Error;

use crate::clock::Clock;
use crate::pow::{self, BlockHash, Header};

/// The session's time budget ran out; no further attempts are hashed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("mining session expired: time budget exhausted")]
pub struct SessionExpired;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The hash qualifies and this nonce is a fresh find.
    ValidHash,
    /// The nonce already produced a valid hash in this session; not a
    /// failure, but not re-announced as a success either.
    DuplicateValid,
    /// The hash does not meet the difficulty.
    NoMatch,
}

/// What one call to `attempt` reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub nonce: u32,
    pub hash: BlockHash,
    pub outcome: AttemptOutcome,
}

/// One attempt as recorded in the session log.
#[derive(Debug, Clone)]
pub struct MiningAttempt {
    pub nonce: u32,
    pub hash: BlockHash,
    pub valid: bool,
    /// Session-elapsed time when the attempt was made.
    pub at: Duration,
}

/// Drives repeated nonce attempts against a single header under a time
/// budget. Expiry is evaluated at each attempt boundary against the
/// injected clock, so an expired session rejects deterministically
/// instead of racing an in-flight computation.
pub struct MiningSession<'a> {
    header: Header,
    difficulty: u32,
    budget: Duration,
    started: Duration,
    clock: &'a dyn Clock,
    attempts: Vec<MiningAttempt>,
    valid: HashMap<u32, BlockHash>,
}

impl<'a> MiningSession<'a> {
    pub fn new(header: Header, difficulty: u32, budget: Duration, clock: &'a dyn Clock) -> Self {
        let started = clock.now();
        Self {
            header,
            difficulty,
            budget,
            started,
            clock,
            attempts: Vec::new(),
            valid: HashMap::new(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }

    /// Budget minus elapsed, saturating at zero.
    pub fn remaining_time(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_time().is_zero()
    }

    /// Evaluate one candidate nonce: encode, double-hash, check difficulty.
    /// Every accepted attempt lands in the log; a nonce that already
    /// produced a valid hash short-circuits to `DuplicateValid` without
    /// re-hashing. Fails with `SessionExpired` once the budget is gone.
    pub fn attempt(&mut self, nonce: u32) -> Result<AttemptResult, SessionExpired> {
        if self.is_expired() {
            return Err(SessionExpired);
        }
        let at = self.elapsed();
        if let Some(&hash) = self.valid.get(&nonce) {
            debug!("nonce {nonce} already produced a valid hash; not re-announced");
            self.attempts.push(MiningAttempt {
                nonce,
                hash,
                valid: true,
                at,
            });
            return Ok(AttemptResult {
                nonce,
                hash,
                outcome: AttemptOutcome::DuplicateValid,
            });
        }
        let hash = BlockHash::from_le_bytes(pow::sha256d(&pow::encode(&self.header, nonce)));
        let valid = pow::meets_difficulty(&hash, self.difficulty);
        self.attempts.push(MiningAttempt {
            nonce,
            hash,
            valid,
            at,
        });
        let outcome = if valid {
            self.valid.insert(nonce, hash);
            debug!("nonce {nonce} -> {hash} meets difficulty {}", self.difficulty);
            AttemptOutcome::ValidHash
        } else {
            AttemptOutcome::NoMatch
        };
        Ok(AttemptResult {
            nonce,
            hash,
            outcome,
        })
    }

    /// Attempt with the most leading zero nibbles; earliest wins ties.
    /// Informational only.
    pub fn best_result(&self) -> Option<&MiningAttempt> {
        self.attempts.iter().reduce(|best, a| {
            if a.hash.leading_zero_nibbles() > best.hash.leading_zero_nibbles() {
                a
            } else {
                best
            }
        })
    }

    pub fn attempts(&self) -> &[MiningAttempt] {
        &self.attempts
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// Distinct nonces confirmed valid so far.
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }
}
