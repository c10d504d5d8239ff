pub mod engine;

pub use engine::{
    BlockEdit, IntegrityEngine, NonceProvider, RepairOutcome, RepairReport, ScanProvider,
    TamperError,
};

/// Per-block repair state as reported to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Link holds and the hash meets difficulty.
    Ok,
    /// Previous-hash mismatch, or the block's own hash fell below
    /// difficulty after a content edit.
    Broken,
    /// Inside its fix window, waiting for a re-link plus re-mine.
    Repairing,
    /// Re-mined within the window; the new Ok baseline for its successor.
    Fixed,
}
