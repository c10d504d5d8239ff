use std::fs;
use std::path::Path;

use log::info;
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::Block;
use crate::pow::BlockHash;

/// A block entry as it appears in `blocks.json`, before validation.
/// Loosely typed on purpose: presence and ranges are checked when
/// converting into the strict `Block` type, and nothing downstream of
/// this module ever sees a record again.
#[derive(Debug, Deserialize)]
pub struct BlockRecord {
    pub name: Option<String>,
    /// Alternate spelling some sources use for `name`.
    pub label: Option<String>,
    pub height: Option<u64>,
    pub version: Option<i64>,
    pub prev_block: Option<String>,
    pub merkle_root: Option<String>,
    pub timestamp: Option<i64>,
    pub bits: Option<i64>,
    /// Alternate spelling: compact target as a hex string.
    pub bits_hex: Option<String>,
}

/// Bad source data. Fatal for the load: the first malformed record
/// aborts with the record index and field named.
#[derive(Debug, Error)]
pub enum MalformedBlockError {
    #[error("failed to read block source: {0}")]
    Io(#[from] std::io::Error),
    #[error("block source is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("block source contains no blocks")]
    EmptyPool,
    #[error("block record {index}: missing field `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("block record {index}: field `{field}` must be 64 hex characters")]
    BadHash { index: usize, field: &'static str },
    #[error("block record {index}: field `{field}` is not valid hex")]
    BadHex { index: usize, field: &'static str },
    #[error("block record {index}: field `{field}` out of u32 range")]
    OutOfRange { index: usize, field: &'static str },
}

/// Load and validate a block pool from a JSON file.
pub fn load_blocks(path: impl AsRef<Path>) -> Result<Vec<Block>, MalformedBlockError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let blocks = parse_blocks(&text)?;
    info!("loaded {} block header(s) from {}", blocks.len(), path.display());
    Ok(blocks)
}

/// Parse and validate a JSON array of block records into strict blocks.
pub fn parse_blocks(text: &str) -> Result<Vec<Block>, MalformedBlockError> {
    let records: Vec<BlockRecord> = serde_json::from_str(text)?;
    if records.is_empty() {
        return Err(MalformedBlockError::EmptyPool);
    }
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| block_from_record(index, record))
        .collect()
}

/// Pick one header from the pool at random, or `None` for an empty pool.
pub fn pick_block<'a, R: rand::Rng + ?Sized>(pool: &'a [Block], rng: &mut R) -> Option<&'a Block> {
    pool.choose(rng)
}

fn block_from_record(index: usize, record: BlockRecord) -> Result<Block, MalformedBlockError> {
    let name = record
        .name
        .or(record.label)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| match record.height {
            Some(h) => format!("Block #{h}"),
            None => "Block #?".to_string(),
        });
    let height = record.height.unwrap_or(0);
    let version = u32_field(index, "version", record.version)?;
    let previous_hash = hash_field(index, "prev_block", record.prev_block)?;
    let merkle_root = hash_field(index, "merkle_root", record.merkle_root)?;
    let timestamp = u32_field(index, "timestamp", record.timestamp)?;
    let bits = bits_field(index, record.bits, record.bits_hex)?;

    // Loaded headers start with nonce 0; finding one is the whole game.
    Ok(Block::new(
        name,
        height,
        version,
        previous_hash,
        merkle_root,
        timestamp,
        bits,
        0,
    ))
}

fn u32_field(
    index: usize,
    field: &'static str,
    value: Option<i64>,
) -> Result<u32, MalformedBlockError> {
    let value = value.ok_or(MalformedBlockError::MissingField { index, field })?;
    u32::try_from(value).map_err(|_| MalformedBlockError::OutOfRange { index, field })
}

fn hash_field(
    index: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<BlockHash, MalformedBlockError> {
    let value = value.ok_or(MalformedBlockError::MissingField { index, field })?;
    BlockHash::from_hex(value.trim()).map_err(|_| MalformedBlockError::BadHash { index, field })
}

fn bits_field(
    index: usize,
    bits: Option<i64>,
    bits_hex: Option<String>,
) -> Result<u32, MalformedBlockError> {
    if let Some(value) = bits {
        return u32::try_from(value).map_err(|_| MalformedBlockError::OutOfRange {
            index,
            field: "bits",
        });
    }
    let Some(hex_str) = bits_hex else {
        return Err(MalformedBlockError::MissingField {
            index,
            field: "bits",
        });
    };
    let trimmed = hex_str.trim().trim_start_matches("0x");
    u32::from_str_radix(trimmed, 16).map_err(|_| MalformedBlockError::BadHex {
        index,
        field: "bits_hex",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(overrides: &[(&str, serde_json::Value)]) -> String {
        let mut obj = serde_json::json!({
            "name": "Block #100000",
            "height": 100000,
            "version": 1,
            "prev_block": "11".repeat(32),
            "merkle_root": "22".repeat(32),
            "timestamp": 1293623863i64,
            "bits": 453281356i64,
        });
        for (key, value) in overrides {
            obj[*key] = value.clone();
        }
        serde_json::to_string(&vec![obj]).unwrap()
    }

    #[test]
    fn valid_record_becomes_a_strict_block() {
        let blocks = parse_blocks(&record_json(&[])).unwrap();
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.name, "Block #100000");
        assert_eq!(b.height, 100000);
        assert_eq!(b.nonce, 0);
        assert_eq!(b.hash, b.compute_hash());
        assert_eq!(b.previous_hash.to_hex(), "11".repeat(32));
    }

    #[test]
    fn bits_hex_spelling_is_accepted() {
        let json = record_json(&[
            ("bits", serde_json::Value::Null),
            ("bits_hex", serde_json::json!("0x1d00ffff")),
        ]);
        let blocks = parse_blocks(&json).unwrap();
        assert_eq!(blocks[0].bits, 0x1d00_ffff);
    }

    #[test]
    fn missing_version_is_reported_by_field() {
        let json = record_json(&[("version", serde_json::Value::Null)]);
        let err = parse_blocks(&json).unwrap_err();
        assert!(matches!(
            err,
            MalformedBlockError::MissingField { index: 0, field: "version" }
        ));
    }

    #[test]
    fn short_prev_hash_is_rejected() {
        let json = record_json(&[("prev_block", serde_json::json!("abcd"))]);
        let err = parse_blocks(&json).unwrap_err();
        assert!(matches!(
            err,
            MalformedBlockError::BadHash { index: 0, field: "prev_block" }
        ));
    }

    #[test]
    fn out_of_range_timestamp_is_rejected() {
        let json = record_json(&[("timestamp", serde_json::json!(-5))]);
        let err = parse_blocks(&json).unwrap_err();
        assert!(matches!(
            err,
            MalformedBlockError::OutOfRange { index: 0, field: "timestamp" }
        ));
        let json = record_json(&[("timestamp", serde_json::json!(5_000_000_000i64))]);
        assert!(parse_blocks(&json).is_err());
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            parse_blocks("[]").unwrap_err(),
            MalformedBlockError::EmptyPool
        ));
    }

    #[test]
    fn name_falls_back_to_the_height() {
        let json = record_json(&[("name", serde_json::Value::Null)]);
        let blocks = parse_blocks(&json).unwrap();
        assert_eq!(blocks[0].name, "Block #100000");
    }

    #[test]
    fn pick_block_draws_from_the_pool() {
        let blocks = parse_blocks(&record_json(&[])).unwrap();
        let mut rng = rand::thread_rng();
        let picked = pick_block(&blocks, &mut rng).unwrap();
        assert_eq!(picked.height, 100000);
        assert!(pick_block(&[], &mut rng).is_none());
    }
}
