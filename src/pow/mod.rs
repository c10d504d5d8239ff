pub mod header;

pub use header::{HEADER_LEN, Header, decode, encode};

use std::fmt;

use serde::{Deserialize, Serialize, de};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA256(SHA256(data)) — the double application is the Bitcoin
/// proof-of-work convention, not an optimization.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// A 32-byte block hash stored in display order (big-endian, the way
/// block explorers print it). The raw double-SHA digest and the 80-byte
/// header layout both use the reversed, little-endian order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash([u8; 32]);

/// Failed to parse a 64-character hex string into a block hash.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("block hash must be exactly 64 hex characters")]
pub struct ParseHashError;

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    /// Build from little-endian bytes: a raw `sha256d` digest or the
    /// 32-byte hash fields inside an encoded header.
    pub fn from_le_bytes(mut raw: [u8; 32]) -> Self {
        raw.reverse();
        BlockHash(raw)
    }

    /// Little-endian order, as serialized inside an 80-byte header.
    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut raw = self.0;
        raw.reverse();
        raw
    }

    /// Parse from display-order hex (explorer style).
    pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
        let bytes = hex::decode(s).map_err(|_| ParseHashError)?;
        let raw: [u8; 32] = bytes.try_into().map_err(|_| ParseHashError)?;
        Ok(BlockHash(raw))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Count of leading zero hex nibbles in display order.
    pub fn leading_zero_nibbles(&self) -> u32 {
        let mut count = 0;
        for &byte in &self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }
}

/// Difficulty is a required count of leading zero hex nibbles of the
/// display-order hash. Difficulty 0 always passes (degenerate/test config).
pub fn meets_difficulty(hash: &BlockHash, difficulty: u32) -> bool {
    hash.leading_zero_nibbles() >= difficulty
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockHash::from_hex(&s).map_err(de::Error::custom)
    }
}
