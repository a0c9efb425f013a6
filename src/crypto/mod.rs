//! Cryptographic Primitives
//!
//! This module contains:
//! - Personalized hashing and double SHA-256
//! - Fixed-depth Merkle inclusion proofs
//! - Note commitments, nullifiers and Pedersen value commitments
//! - The Groth16 verifier boundary

pub mod commitment;
pub mod groth16;
pub mod hash;
pub mod merkle;

// Re-exports for convenience
pub use commitment::{
    ciphertext_digest, compute_note_commitment, compute_nullifier, compute_value_commitment,
    derive_blinding_factor, verify_conservation, verify_note_commitment,
    verify_value_commitment, Blinding, ShieldedAddress, ValueCommitment, DIVERSIFIER_LEN,
};
pub use groth16::{
    FieldElement, Groth16Proof, ProofVerifier, VerificationKeyId, VerifierError,
};
pub use hash::{
    double_hash, hash256, hash256_personalized, hash_pair, Personalization,
    PERSONALIZATION_LEN,
};
pub use merkle::{compute_root, MerkleError, MerkleProof, TREE_DEPTH};
