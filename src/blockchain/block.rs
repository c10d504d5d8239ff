use serde::{Deserialize, Serialize};

use crate::pow::{self, BlockHash, Header};

/// A single entry in the chain: a Bitcoin-style header plus the label
/// and height bookkeeping the simulator shows the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub height: u64,
    pub version: u32,
    pub previous_hash: BlockHash,
    pub merkle_root: BlockHash, // opaque input; never built from transactions
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    pub hash: BlockHash, // cached; only ever written from `compute_hash`
}

impl Block {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        height: u64,
        version: u32,
        previous_hash: BlockHash,
        merkle_root: BlockHash,
        timestamp: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        let mut block = Self {
            name,
            height,
            version,
            previous_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
            hash: BlockHash::ZERO,
        };
        block.refresh_hash();
        block
    }

    /// The hashed view of this block (everything but the nonce).
    pub fn header(&self) -> Header {
        Header {
            version: self.version,
            previous_hash: self.previous_hash,
            merkle_root: self.merkle_root,
            timestamp: self.timestamp,
            bits: self.bits,
        }
    }

    /// Double-SHA of the canonically encoded header with the stored nonce.
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::from_le_bytes(pow::sha256d(&pow::encode(&self.header(), self.nonce)))
    }

    /// Re-derive the cached hash after any field mutation.
    pub fn refresh_hash(&mut self) {
        self.hash = self.compute_hash();
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    /// Validate that the cached hash matches the block content and
    /// satisfies the PoW difficulty. (Does NOT validate chain linkage.)
    pub fn is_valid(&self, difficulty: u32) -> bool {
        self.hash == self.compute_hash() && self.meets_difficulty(difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            "Test block".into(),
            7,
            1,
            BlockHash::ZERO,
            BlockHash::from_hex(&"ab".repeat(32)).unwrap(),
            1_700_000_000,
            0x1d00_ffff,
            0,
        )
    }

    #[test]
    fn new_block_has_a_consistent_cache() {
        let b = sample_block();
        assert_eq!(b.hash, b.compute_hash());
        assert!(b.is_valid(0));
    }

    #[test]
    fn mutation_invalidates_the_cache_until_refreshed() {
        let mut b = sample_block();
        let old = b.hash;
        b.timestamp += 1;
        assert_ne!(old, b.compute_hash());
        assert!(!b.is_valid(0));
        b.refresh_hash();
        assert!(b.is_valid(0));
        assert_ne!(b.hash, old);
    }

    #[test]
    fn nonce_changes_the_hash() {
        let mut b = sample_block();
        let old = b.hash;
        b.nonce = b.nonce.wrapping_add(1);
        b.refresh_hash();
        assert_ne!(b.hash, old);
    }
}
