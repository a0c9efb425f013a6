//! Backing-Chain Relay
//!
//! This module contains:
//! - Header parsing at fixed offsets
//! - Compact difficulty decoding and chain work
//! - The proof-of-work oracle boundary
//! - The light client itself (tip selection, reorgs, confirmation queries)

pub mod client;
pub mod header;
pub mod pow;
pub mod work;

// Re-exports for convenience
pub use client::{
    Checkpoint, Relay, RelayConfig, RelayError, Reorg, SubmitOutcome, DEFAULT_MIN_CONFIRMATIONS,
};
pub use header::{BlockHeader, ChainTip, HeaderError, ParsedHeader, HEADER_MIN_LEN};
pub use pow::{AcceptAllPowOracle, PowError, PowOracle, TargetPowOracle};
pub use work::{bits_to_target, hash_meets_target, work_from_bits, WorkError};
