//! Compact Difficulty and Chain Work
//!
//! `bits = (exponent << 24) | mantissa`, `target = mantissa * 256^(exponent - 3)`.
//! Work per block is `floor(2^256 / (target + 1))`; the canonical tip is the
//! header with the most cumulative work.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use thiserror::Error;

use crate::types::Hash32;

/// Compact target decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorkError {
    #[error("sign bit set in compact target")]
    NegativeTarget,

    #[error("compact target decodes to zero")]
    ZeroTarget,

    #[error("compact target exceeds 256 bits")]
    TargetOverflow,
}

/// Split compact bits into (exponent, mantissa)
pub fn unpack_bits(bits: u32) -> (u32, u32) {
    (bits >> 24, bits & 0x00ff_ffff)
}

/// Decode compact `bits` into the full 256-bit target
pub fn bits_to_target(bits: u32) -> Result<BigUint, WorkError> {
    let (exponent, mantissa) = unpack_bits(bits);

    if mantissa & 0x0080_0000 != 0 {
        return Err(WorkError::NegativeTarget);
    }

    let mant = BigUint::from(mantissa);
    let target = if exponent <= 3 {
        mant >> (8 * (3 - exponent))
    } else {
        mant << (8 * (exponent - 3))
    };

    if target.is_zero() {
        return Err(WorkError::ZeroTarget);
    }
    if target.bits() > 256 {
        return Err(WorkError::TargetOverflow);
    }

    Ok(target)
}

/// Work contributed by one block with compact target `bits`
pub fn work_from_bits(bits: u32) -> Result<BigUint, WorkError> {
    let target = bits_to_target(bits)?;
    let two_256 = BigUint::one() << 256u32;
    Ok(two_256 / (target + BigUint::one()))
}

/// Whether a digest, read as a little-endian integer, is within `target`
pub fn hash_meets_target(hash: &Hash32, target: &BigUint) -> bool {
    BigUint::from_bytes_le(hash.as_bytes()) <= *target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regtest_bits() {
        // 0x207fffff: target = 0x7fffff << 232, work = 2
        let target = bits_to_target(0x207f_ffff).unwrap();
        assert_eq!(target, BigUint::from(0x7f_ffffu32) << 232u32);
        assert_eq!(work_from_bits(0x207f_ffff).unwrap(), BigUint::from(2u32));
    }

    #[test]
    fn test_harder_target_means_more_work() {
        let easy = work_from_bits(0x207f_ffff).unwrap();
        let harder = work_from_bits(0x1f07_ffff).unwrap();
        let hardest = work_from_bits(0x1d00_ffff).unwrap();
        assert!(harder > easy);
        assert!(hardest > harder);
    }

    #[test]
    fn test_bitcoin_genesis_work() {
        // Well-known: work of a difficulty-1 block is 0x100010001
        assert_eq!(
            work_from_bits(0x1d00_ffff).unwrap(),
            BigUint::from(0x1_0001_0001u64)
        );
    }

    #[test]
    fn test_small_exponent_shifts_right() {
        // exponent 2 keeps the top two mantissa bytes
        assert_eq!(bits_to_target(0x0212_3456).unwrap(), BigUint::from(0x1234u32));
    }

    #[test]
    fn test_invalid_bits() {
        assert_eq!(bits_to_target(0x2080_0000), Err(WorkError::NegativeTarget));
        assert_eq!(bits_to_target(0x2000_0000), Err(WorkError::ZeroTarget));
        assert_eq!(bits_to_target(0x0100_00ff), Err(WorkError::ZeroTarget));
        assert_eq!(bits_to_target(0xff7f_ffff), Err(WorkError::TargetOverflow));
    }

    #[test]
    fn test_hash_meets_target() {
        let target = BigUint::from(0xffu32);
        let mut low = [0u8; 32];
        low[0] = 0xff;
        assert!(hash_meets_target(&Hash32(low), &target));

        let mut high = [0u8; 32];
        high[1] = 0x01;
        assert!(!hash_meets_target(&Hash32(high), &target));
    }
}
