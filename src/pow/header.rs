use super::BlockHash;

/// Canonical Bitcoin block header size in bytes.
pub const HEADER_LEN: usize = 80;

/// The hashed view of a block: every field that enters the 80-byte
/// preimage except the nonce, which is supplied at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub previous_hash: BlockHash,
    pub merkle_root: BlockHash,
    pub timestamp: u32,
    pub bits: u32,
}

/// Serialize a header plus candidate nonce into the canonical 80-byte
/// layout: all integers little-endian, both hashes in little-endian
/// wire order. Pure and deterministic; field sizes are enforced at the
/// load boundary, so there is no error path here.
pub fn encode(header: &Header, nonce: u32) -> [u8; HEADER_LEN] {
    let mut raw = [0u8; HEADER_LEN];
    raw[0..4].copy_from_slice(&header.version.to_le_bytes());
    raw[4..36].copy_from_slice(&header.previous_hash.to_le_bytes());
    raw[36..68].copy_from_slice(&header.merkle_root.to_le_bytes());
    raw[68..72].copy_from_slice(&header.timestamp.to_le_bytes());
    raw[72..76].copy_from_slice(&header.bits.to_le_bytes());
    raw[76..80].copy_from_slice(&nonce.to_le_bytes());
    raw
}

/// Exact inverse of `encode`: recovers the header fields and the nonce.
pub fn decode(raw: &[u8; HEADER_LEN]) -> (Header, u32) {
    let header = Header {
        version: u32_at(raw, 0),
        previous_hash: hash_at(raw, 4),
        merkle_root: hash_at(raw, 36),
        timestamp: u32_at(raw, 68),
        bits: u32_at(raw, 72),
    };
    let nonce = u32_at(raw, 76);
    (header, nonce)
}

fn u32_at(raw: &[u8; HEADER_LEN], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

fn hash_at(raw: &[u8; HEADER_LEN], at: usize) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&raw[at..at + 32]);
    BlockHash::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{meets_difficulty, sha256d};

    fn sample_header() -> Header {
        Header {
            version: 2,
            previous_hash: BlockHash::from_hex(&"11".repeat(32)).unwrap(),
            merkle_root: BlockHash::from_hex(&"22".repeat(32)).unwrap(),
            timestamp: 1_700_000_000,
            bits: 0x1d00_ffff,
        }
    }

    #[test]
    fn encode_is_deterministic() {
        let h = sample_header();
        assert_eq!(encode(&h, 42), encode(&h, 42));
    }

    #[test]
    fn encode_is_injective_in_the_nonce() {
        let h = sample_header();
        let a = encode(&h, 42);
        let b = encode(&h, 43);
        assert_ne!(a, b);
        // Only the trailing 4 bytes may differ.
        assert_eq!(a[..76], b[..76]);
        assert_ne!(sha256d(&a), sha256d(&b));
    }

    #[test]
    fn decode_round_trips() {
        let h = sample_header();
        let raw = encode(&h, 0xdead_beef);
        let (decoded, nonce) = decode(&raw);
        assert_eq!(decoded, h);
        assert_eq!(nonce, 0xdead_beef);
    }

    #[test]
    fn bitcoin_genesis_header_hashes_to_the_known_value() {
        // Mainnet block 0, straight from the chain.
        let header = Header {
            version: 1,
            previous_hash: BlockHash::ZERO,
            merkle_root: BlockHash::from_hex(
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            )
            .unwrap(),
            timestamp: 1231006505,
            bits: 0x1d00_ffff,
        };
        let raw = encode(&header, 2083236893);
        let hash = BlockHash::from_le_bytes(sha256d(&raw));
        assert_eq!(
            hash.to_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert_eq!(hash.leading_zero_nibbles(), 10);
        assert!(meets_difficulty(&hash, 8));
    }
}
