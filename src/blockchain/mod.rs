pub mod block;
pub mod model;

pub use block::Block;
pub use model::Chain;

/// Default Proof-of-Work difficulty (leading zero hex nibbles).
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Header version stamped on demo blocks.
pub const DEMO_VERSION: u32 = 1;

/// Compact-target field stamped on demo blocks (mainnet genesis value;
/// informational only, difficulty is checked by nibble count).
pub const DEMO_BITS: u32 = 0x1d00_ffff;

/// Seconds between consecutive demo block timestamps.
pub const DEMO_BLOCK_SPACING_SECS: u32 = 60;

/// Payload labels for demo blocks; wraps when the chain is longer.
pub const DEMO_PAYLOADS: &[&str] = &[
    "Payroll transfers",
    "Supplier payment A",
    "Customer refund",
    "Quarterly bonus",
    "Ledger adjustment",
    "Supply purchase",
    "Invoice #8421",
    "Travel reimbursement",
];
