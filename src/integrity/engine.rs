use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use super::BlockStatus;
use crate::blockchain::{Block, Chain};
use crate::clock::Clock;
use crate::mining::{AttemptOutcome, MiningSession, SessionExpired};
use crate::notify::Notifier;
use crate::pow::BlockHash;

/// A simulated tamper edit to one block's content fields. The nonce is
/// deliberately not editable here: tampering never auto-fixes it.
#[derive(Debug, Clone, Copy)]
pub enum BlockEdit {
    Timestamp(u32),
    MerkleRoot(BlockHash),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TamperError {
    /// The final block has no successor to validate against and is off
    /// limits by construction.
    #[error("the last block cannot be tampered with")]
    LastBlock,
    #[error("block index {0} out of range")]
    OutOfRange(usize),
}

/// Supplies candidate nonces during a repair window: interactive stdin
/// in the binary, a scripted scan in tests. Returning `None` abandons
/// the current window.
pub trait NonceProvider {
    fn next_nonce(&mut self, block: &Block, remaining: Duration) -> Option<u32>;
}

/// Sequential scan provider for non-interactive repair.
#[derive(Debug, Default)]
pub struct ScanProvider {
    next: u32,
}

impl ScanProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceProvider for ScanProvider {
    fn next_nonce(&mut self, _block: &Block, _remaining: Duration) -> Option<u32> {
        let nonce = self.next;
        self.next = self.next.wrapping_add(1);
        Some(nonce)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Every block from the starting index to the tip is healthy again.
    ChainConsistent,
    /// A fix window expired (or its provider gave up) at `index`; that
    /// block stays broken and nothing past it was touched.
    PropagationHalted { index: usize },
}

/// Result of one forward repair pass.
#[derive(Debug)]
pub struct RepairReport {
    /// Indices that needed a fix window and were re-mined, in order.
    pub fixed: Vec<usize>,
    pub outcome: RepairOutcome,
}

impl RepairReport {
    pub fn halted_at(&self) -> Option<usize> {
        match self.outcome {
            RepairOutcome::PropagationHalted { index } => Some(index),
            RepairOutcome::ChainConsistent => None,
        }
    }
}

/// Chain repair state machine: detects the hash break caused by a block
/// mutation and walks the repair forward, block by block, each under a
/// bounded fix window.
pub struct IntegrityEngine<'a> {
    clock: &'a dyn Clock,
    fix_window: Duration,
}

impl<'a> IntegrityEngine<'a> {
    pub fn new(clock: &'a dyn Clock, fix_window: Duration) -> Self {
        Self { clock, fix_window }
    }

    /// Apply a content edit to block `index` and recompute its hash with
    /// the current stored nonce. The downstream link is now broken (the
    /// successor still references the old hash); call `repair` to walk
    /// the fix forward.
    pub fn tamper(
        &self,
        chain: &mut Chain,
        index: usize,
        edit: BlockEdit,
    ) -> Result<(), TamperError> {
        if index >= chain.len() {
            return Err(TamperError::OutOfRange(index));
        }
        if index + 1 == chain.len() {
            return Err(TamperError::LastBlock);
        }
        let block = chain.block_mut(index);
        match edit {
            BlockEdit::Timestamp(timestamp) => block.timestamp = timestamp,
            BlockEdit::MerkleRoot(root) => block.merkle_root = root,
        }
        block.refresh_hash();
        info!("tampered block {index}; new hash {}", block.hash);
        Ok(())
    }

    /// Walk from `start` to the chain tip. At each index the block is
    /// re-linked to its (possibly just-repaired) predecessor and its hash
    /// recomputed with the stored nonce; if it no longer qualifies, a
    /// fresh mining session bounded by the fix window must find a new
    /// nonce before propagation continues. An expired window halts the
    /// pass and leaves everything downstream untouched — a stable,
    /// inspectable state, not a crash.
    ///
    /// Re-tampering a block mid-repair is expressed by calling `tamper`
    /// and `repair` again: sessions are per block and per call, so the
    /// old window and its attempt log are discarded by construction.
    pub fn repair(
        &self,
        chain: &mut Chain,
        start: usize,
        provider: &mut dyn NonceProvider,
        notifier: &mut dyn Notifier,
    ) -> RepairReport {
        let mut fixed = Vec::new();
        for index in start..chain.len() {
            if index > start {
                let upstream = chain.block(index - 1).hash;
                let block = chain.block_mut(index);
                block.previous_hash = upstream;
                block.refresh_hash();
            }
            if chain.block_ok(index) {
                notifier.block_status(index, BlockStatus::Ok);
                continue;
            }
            notifier.block_status(index, BlockStatus::Broken);
            if !self.fix_block(chain, index, provider, notifier) {
                warn!("fix window closed at block {index}; propagation halted");
                return RepairReport {
                    fixed,
                    outcome: RepairOutcome::PropagationHalted { index },
                };
            }
            fixed.push(index);
        }
        info!("chain consistent again; {} block(s) re-mined", fixed.len());
        RepairReport {
            fixed,
            outcome: RepairOutcome::ChainConsistent,
        }
    }

    /// One fix window: feed provider nonces into a fresh session until a
    /// valid hash is committed or the window closes. Returns whether the
    /// block was fixed.
    fn fix_block(
        &self,
        chain: &mut Chain,
        index: usize,
        provider: &mut dyn NonceProvider,
        notifier: &mut dyn Notifier,
    ) -> bool {
        notifier.block_status(index, BlockStatus::Repairing);
        let mut session = MiningSession::new(
            chain.block(index).header(),
            chain.difficulty(),
            self.fix_window,
            self.clock,
        );
        loop {
            let Some(nonce) = provider.next_nonce(chain.block(index), session.remaining_time())
            else {
                return false;
            };
            match session.attempt(nonce) {
                Err(SessionExpired) => return false,
                Ok(result) => {
                    notifier.attempt(index, &result);
                    if result.outcome == AttemptOutcome::ValidHash {
                        let block = chain.block_mut(index);
                        block.nonce = nonce;
                        block.refresh_hash();
                        notifier.block_status(index, BlockStatus::Fixed);
                        return true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::DEMO_PAYLOADS;
    use crate::clock::ManualClock;
    use crate::notify::NullNotifier;

    /// Provider that walks away without offering a single nonce.
    struct GivesUp;

    impl NonceProvider for GivesUp {
        fn next_nonce(&mut self, _block: &Block, _remaining: Duration) -> Option<u32> {
            None
        }
    }

    fn demo_chain(n: usize, difficulty: u32) -> Chain {
        Chain::build_demo(n, difficulty, DEMO_PAYLOADS, 1_700_000_000)
    }

    #[test]
    fn tamper_rejects_the_last_block_and_bad_indices() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(3, 1);
        assert_eq!(
            engine.tamper(&mut chain, 2, BlockEdit::Timestamp(0)),
            Err(TamperError::LastBlock)
        );
        assert_eq!(
            engine.tamper(&mut chain, 9, BlockEdit::Timestamp(0)),
            Err(TamperError::OutOfRange(9))
        );
    }

    #[test]
    fn tamper_breaks_the_downstream_link_but_not_the_nonce() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(3, 1);
        let old_nonce = chain.block(0).nonce;
        let block2_prev = chain.block(2).previous_hash;

        let ts = chain.block(0).timestamp + 1;
        engine
            .tamper(&mut chain, 0, BlockEdit::Timestamp(ts))
            .unwrap();

        // The stored nonce is untouched and the successor's link is stale.
        assert_eq!(chain.block(0).nonce, old_nonce);
        assert!(!chain.link_ok(1));
        assert!(chain.first_broken().unwrap() <= 1);
        // Block 2 is unaffected until block 1 is repaired.
        assert_eq!(chain.block(2).previous_hash, block2_prev);
    }

    #[test]
    fn repair_propagates_to_a_consistent_chain() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(3, 1);

        let ts = chain.block(0).timestamp + 1;
        engine
            .tamper(&mut chain, 0, BlockEdit::Timestamp(ts))
            .unwrap();

        let report = engine.repair(&mut chain, 0, &mut ScanProvider::new(), &mut NullNotifier);
        assert_eq!(report.outcome, RepairOutcome::ChainConsistent);
        assert_eq!(report.halted_at(), None);
        assert!(chain.is_consistent());
        for i in 0..chain.len() {
            assert!(chain.block(i).is_valid(1));
            assert!(chain.link_ok(i));
        }
        // Broken links are re-mined in forward index order.
        assert!(report.fixed.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn merkle_edit_is_repaired_like_any_other_tamper() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(4, 1);

        let root = BlockHash::from_le_bytes(crate::pow::sha256d(b"forged payload"));
        engine
            .tamper(&mut chain, 1, BlockEdit::MerkleRoot(root))
            .unwrap();
        assert!(!chain.is_consistent());

        let report = engine.repair(&mut chain, 1, &mut ScanProvider::new(), &mut NullNotifier);
        assert_eq!(report.outcome, RepairOutcome::ChainConsistent);
        assert!(chain.is_consistent());
        assert_eq!(chain.block(1).merkle_root, root);
    }

    #[test]
    fn abandoned_window_halts_propagation_in_place() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(4, 2);

        let ts = chain.block(0).timestamp + 1;
        engine
            .tamper(&mut chain, 0, BlockEdit::Timestamp(ts))
            .unwrap();
        let first_broken = chain.first_broken().unwrap();
        let downstream: Vec<BlockHash> = (first_broken + 1..chain.len())
            .map(|i| chain.block(i).previous_hash)
            .collect();

        let report = engine.repair(&mut chain, 0, &mut GivesUp, &mut NullNotifier);
        let halted = report.halted_at().unwrap();
        assert_eq!(halted, first_broken);
        assert!(report.fixed.is_empty());
        assert!(!chain.is_consistent());
        assert_eq!(chain.first_broken(), Some(halted));
        // Everything past the halt still references its stale ancestor.
        for (offset, prev) in downstream.iter().enumerate() {
            assert_eq!(chain.block(halted + 1 + offset).previous_hash, *prev);
        }
    }

    #[test]
    fn zero_length_window_expires_on_the_first_attempt() {
        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::ZERO);
        let mut chain = demo_chain(3, 1);

        let ts = chain.block(0).timestamp + 1;
        engine
            .tamper(&mut chain, 0, BlockEdit::Timestamp(ts))
            .unwrap();
        let report = engine.repair(&mut chain, 0, &mut ScanProvider::new(), &mut NullNotifier);
        assert!(report.halted_at().is_some());
        assert!(report.fixed.is_empty());
    }

    #[test]
    fn notifier_sees_the_broken_repairing_fixed_sequence() {
        struct Recorder(Vec<(usize, BlockStatus)>);
        impl Notifier for Recorder {
            fn block_status(&mut self, index: usize, status: BlockStatus) {
                self.0.push((index, status));
            }
            fn attempt(&mut self, _index: usize, _result: &crate::mining::AttemptResult) {}
        }

        let clock = ManualClock::new();
        let engine = IntegrityEngine::new(&clock, Duration::from_secs(30));
        let mut chain = demo_chain(3, 1);
        let ts = chain.block(0).timestamp + 1;
        engine
            .tamper(&mut chain, 0, BlockEdit::Timestamp(ts))
            .unwrap();

        let mut recorder = Recorder(Vec::new());
        let report = engine.repair(&mut chain, 0, &mut ScanProvider::new(), &mut recorder);
        assert_eq!(report.outcome, RepairOutcome::ChainConsistent);
        for &index in &report.fixed {
            let seq: Vec<BlockStatus> = recorder
                .0
                .iter()
                .filter(|(i, _)| *i == index)
                .map(|(_, s)| *s)
                .collect();
            assert_eq!(
                seq,
                vec![BlockStatus::Broken, BlockStatus::Repairing, BlockStatus::Fixed]
            );
        }
    }
}
