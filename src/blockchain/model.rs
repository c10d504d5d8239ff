use log::warn;

use super::{Block, DEMO_BITS, DEMO_BLOCK_SPACING_SECS, DEMO_VERSION};
use crate::mining::{self, MAX_SEARCH_TRIES};
use crate::pow::{self, BlockHash};

/// Ordered hash-linked sequence of blocks sharing one difficulty.
/// Owned by the caller and passed by reference through every operation;
/// there is no process-wide chain singleton.
#[derive(Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Chain {
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Self {
        Self { blocks, difficulty }
    }

    /// Build a small pre-mined demo chain: `n` linked blocks whose opaque
    /// merkle roots are derived from the payload labels, timestamps spaced
    /// evenly, genesis linked to the all-zero hash. Fully deterministic for
    /// a fixed `base_timestamp`.
    pub fn build_demo(n: usize, difficulty: u32, payloads: &[&str], base_timestamp: u32) -> Self {
        let mut blocks = Vec::with_capacity(n);
        let mut previous_hash = BlockHash::ZERO;
        for i in 0..n {
            let label = payloads[i % payloads.len()];
            let merkle_root = BlockHash::from_le_bytes(pow::sha256d(label.as_bytes()));
            let mut block = Block::new(
                label.to_string(),
                i as u64,
                DEMO_VERSION,
                previous_hash,
                merkle_root,
                base_timestamp + (i as u32) * DEMO_BLOCK_SPACING_SECS,
                DEMO_BITS,
                0,
            );
            match mining::search_nonce(&block.header(), difficulty, MAX_SEARCH_TRIES) {
                Some((nonce, _)) => {
                    block.nonce = nonce;
                    block.refresh_hash();
                }
                None => {
                    // Keep the unmined block; the chain will simply report it
                    // as not meeting difficulty.
                    warn!("no nonce within {MAX_SEARCH_TRIES} tries for demo block {i}");
                }
            }
            previous_hash = block.hash;
            blocks.push(block);
        }
        Self { blocks, difficulty }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    pub(crate) fn block_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }

    /// Link predicate: block 0 is always linked; every other block must
    /// reference the actual hash of its predecessor.
    pub fn link_ok(&self, index: usize) -> bool {
        index == 0 || self.blocks[index].previous_hash == self.blocks[index - 1].hash
    }

    /// A block is healthy when its link holds and its own hash meets the
    /// configured difficulty.
    pub fn block_ok(&self, index: usize) -> bool {
        self.link_ok(index) && self.blocks[index].meets_difficulty(self.difficulty)
    }

    /// First unhealthy index, if any.
    pub fn first_broken(&self) -> Option<usize> {
        (0..self.blocks.len()).find(|&i| !self.block_ok(i))
    }

    pub fn is_consistent(&self) -> bool {
        self.first_broken().is_none()
    }
}
