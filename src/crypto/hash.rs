//! Hash Engine
//!
//! Two primitives back everything in the bridge:
//!
//! - BLAKE2b-256 with a 16-byte personalization for every derived value
//!   (block hashes, note commitments, blinding factors, nullifiers). The
//!   personalization is mixed into the parameter block, so a digest computed
//!   under one tag is useless under another.
//! - Double SHA-256 for Merkle node combination, matching the backing chain's
//!   own transaction tree so proofs check against the real header field.

use sha2::{Digest, Sha256};

use crate::types::Hash32;

/// Width of a BLAKE2b personalization
pub const PERSONALIZATION_LEN: usize = 16;

/// Domain tag for a personalized hash
pub type Personalization = [u8; PERSONALIZATION_LEN];

/// Block header hashing, one tag per backing network
pub const HEADER_MAINNET_PERSONALIZATION: &Personalization = b"ZcashHeader_Main";
pub const HEADER_TESTNET_PERSONALIZATION: &Personalization = b"ZcashHeader_Test";
pub const HEADER_REGTEST_PERSONALIZATION: &Personalization = b"ZcashHeader_Rgst";

/// Permit-bound note randomness (`rcm`)
pub const BLINDING_PERSONALIZATION: &Personalization = b"ZBridge_PermitRc";

/// Note commitments
pub const NOTE_COMMITMENT_PERSONALIZATION: &Personalization = b"ZBridge_NoteComm";

/// Nullifiers
pub const NULLIFIER_PERSONALIZATION: &Personalization = b"ZBridge_Nullifer";

/// Shielded address fingerprints stored on vaults
pub const ADDRESS_PERSONALIZATION: &Personalization = b"ZBridge_AddrHash";

/// Digests of opaque ciphertexts bound into challenge proofs
pub const CIPHERTEXT_PERSONALIZATION: &Personalization = b"ZBridge_CtxtHash";

/// BLAKE2b-256 with an all-zero personalization
pub fn hash256(data: &[u8]) -> Hash32 {
    hash256_personalized(data, &[0u8; PERSONALIZATION_LEN])
}

/// BLAKE2b-256 with `tag` as the personalization block
pub fn hash256_personalized(data: &[u8], tag: &Personalization) -> Hash32 {
    hash256_personalized_parts(&[data], tag)
}

/// Personalized hash over several slices, without concatenating them first
pub fn hash256_personalized_parts(parts: &[&[u8]], tag: &Personalization) -> Hash32 {
    let mut state = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(tag)
        .to_state();
    for part in parts {
        state.update(part);
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(state.finalize().as_bytes());
    Hash32(out)
}

/// Double SHA-256 (backing chain tree hashing)
pub fn double_hash(data: &[u8]) -> Hash32 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash32(second.into())
}

/// Double SHA-256 of two 32-byte nodes concatenated
pub fn hash_pair(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut combined = [0u8; 64];
    combined[0..32].copy_from_slice(left.as_bytes());
    combined[32..64].copy_from_slice(right.as_bytes());
    double_hash(&combined)
}
