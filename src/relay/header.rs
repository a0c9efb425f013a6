//! Backing-Chain Block Headers
//!
//! Wire layout (little-endian integers, hashes in internal byte order):
//!
//! ```text
//! [0..4)     version
//! [4..36)    prev block hash
//! [36..68)   merkle root (transactions)
//! [68..100)  sapling root (note commitment tree)
//! [100..104) timestamp
//! [104..108) bits
//! [108..140) nonce
//! [140..)    equihash solution (opaque here, hashed with the header)
//! ```

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BlockHash, Hash32};

/// Minimum length of a serialized header
pub const HEADER_MIN_LEN: usize = 140;

/// Header parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header is {len} bytes, need at least {HEADER_MIN_LEN}")]
    TooShort { len: usize },
}

fn read_hash(raw: &[u8], start: usize) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw[start..start + 32]);
    Hash32(out)
}

fn read_u32(raw: &[u8], start: usize) -> u32 {
    let mut out = [0u8; 4];
    out.copy_from_slice(&raw[start..start + 4]);
    u32::from_le_bytes(out)
}

/// Fields read out of a raw header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub version: i32,
    pub prev_hash: BlockHash,
    pub merkle_root: Hash32,
    pub sapling_root: Hash32,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: [u8; 32],
}

impl ParsedHeader {
    /// Parse the fixed-offset fields of a serialized header
    pub fn parse(raw: &[u8]) -> Result<Self, HeaderError> {
        if raw.len() < HEADER_MIN_LEN {
            return Err(HeaderError::TooShort { len: raw.len() });
        }

        let mut nonce = [0u8; 32];
        nonce.copy_from_slice(&raw[108..140]);

        Ok(Self {
            version: read_u32(raw, 0) as i32,
            prev_hash: read_hash(raw, 4),
            merkle_root: read_hash(raw, 36),
            sapling_root: read_hash(raw, 68),
            timestamp: read_u32(raw, 100),
            bits: read_u32(raw, 104),
            nonce,
        })
    }

    /// Serialize the fixed 140-byte part
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(HEADER_MIN_LEN);
        raw.extend_from_slice(&self.version.to_le_bytes());
        raw.extend_from_slice(self.prev_hash.as_bytes());
        raw.extend_from_slice(self.merkle_root.as_bytes());
        raw.extend_from_slice(self.sapling_root.as_bytes());
        raw.extend_from_slice(&self.timestamp.to_le_bytes());
        raw.extend_from_slice(&self.bits.to_le_bytes());
        raw.extend_from_slice(&self.nonce);
        raw
    }
}

/// A header accepted by the relay. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
    pub merkle_root: Hash32,
    pub sapling_root: Hash32,
    pub version: i32,
    pub timestamp: u32,
    pub bits: u32,
    pub height: u64,
    /// Sum of work from the checkpoint up to and including this header
    pub cumulative_work: BigUint,
    pub verified: bool,
}

impl BlockHeader {
    pub(crate) fn from_parsed(
        hash: BlockHash,
        parsed: &ParsedHeader,
        height: u64,
        cumulative_work: BigUint,
    ) -> Self {
        Self {
            hash,
            prev_hash: parsed.prev_hash,
            merkle_root: parsed.merkle_root,
            sapling_root: parsed.sapling_root,
            version: parsed.version,
            timestamp: parsed.timestamp,
            bits: parsed.bits,
            height,
            cumulative_work,
            verified: true,
        }
    }
}

/// Pointer to the header with the most cumulative work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub hash: BlockHash,
    pub height: u64,
    pub cumulative_work: BigUint,
}

impl ChainTip {
    pub(crate) fn of(header: &BlockHeader) -> Self {
        Self {
            hash: header.hash,
            height: header.height,
            cumulative_work: header.cumulative_work.clone(),
        }
    }
}
