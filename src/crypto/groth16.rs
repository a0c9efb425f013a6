//! Groth16 Verifier Boundary
//!
//! Circuits and proving live outside this crate. The bridge and the vault
//! registry hand a proof, its public inputs and the circuit it claims to
//! satisfy to a [`ProofVerifier`]. Any error is a rejection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Hash32;

/// Public input encoding (32 bytes, little-endian field element)
pub type FieldElement = [u8; 32];

/// Groth16 proof structure (256 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Groth16Proof {
    /// A point (G1) - 64 bytes
    pub a: [u8; 64],
    /// B point (G2) - 128 bytes
    pub b: [u8; 128],
    /// C point (G1) - 64 bytes
    pub c: [u8; 64],
}

impl Default for Groth16Proof {
    fn default() -> Self {
        Self {
            a: [0u8; 64],
            b: [0u8; 128],
            c: [0u8; 64],
        }
    }
}

impl std::fmt::Debug for Groth16Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Groth16Proof(a={}..)", hex::encode(&self.a[..8]))
    }
}

impl Groth16Proof {
    pub const SIZE: usize = 64 + 128 + 64;

    pub fn from_bytes(bytes: &[u8; 256]) -> Self {
        let mut a = [0u8; 64];
        let mut b = [0u8; 128];
        let mut c = [0u8; 64];

        a.copy_from_slice(&bytes[0..64]);
        b.copy_from_slice(&bytes[64..192]);
        c.copy_from_slice(&bytes[192..256]);

        Self { a, b, c }
    }

    pub fn to_bytes(&self) -> [u8; 256] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..64].copy_from_slice(&self.a);
        bytes[64..192].copy_from_slice(&self.b);
        bytes[192..256].copy_from_slice(&self.c);
        bytes
    }
}

/// Circuit a proof is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKeyId {
    /// Mint: note, value commitments and permit are consistent
    Mint,
    /// Vault obligation attestation
    BalanceProof,
    /// Revealed note opening matches the recorded ciphertext
    IssueChallenge,
    /// Encrypted redeem destination does not decrypt to a valid address
    RedeemChallenge,
}

impl std::fmt::Display for VerificationKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mint => "mint",
            Self::BalanceProof => "balance_proof",
            Self::IssueChallenge => "issue_challenge",
            Self::RedeemChallenge => "redeem_challenge",
        };
        write!(f, "{}", s)
    }
}

/// Verifier failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierError {
    #[error("verifier unavailable: {0}")]
    Unavailable(String),

    #[error("no verification key registered for {0}")]
    UnknownKey(VerificationKeyId),

    #[error("wrong number of public inputs: expected {expected}, got {got}")]
    InputCount { expected: usize, got: usize },
}

/// zk-SNARK verifier boundary
#[cfg_attr(test, mockall::automock)]
pub trait ProofVerifier: Send + Sync {
    /// `Ok(true)` only for a valid proof
    fn verify(
        &self,
        proof: &Groth16Proof,
        public_inputs: &[FieldElement],
        vk: VerificationKeyId,
    ) -> Result<bool, VerifierError>;
}

/// Field element from a 64-bit integer
pub fn field_from_u64(value: u64) -> FieldElement {
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&value.to_le_bytes());
    out
}

/// Field element from a 128-bit integer
pub fn field_from_u128(value: u128) -> FieldElement {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&value.to_le_bytes());
    out
}

pub fn field_from_hash(hash: &Hash32) -> FieldElement {
    hash.0
}

/// Run a verifier, folding errors into rejection
pub fn accepts(
    verifier: &dyn ProofVerifier,
    proof: &Groth16Proof,
    public_inputs: &[FieldElement],
    vk: VerificationKeyId,
) -> bool {
    match verifier.verify(proof, public_inputs, vk) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(target: "zbridge::security", vk = %vk, error = %e, "Proof verifier failed");
            false
        }
    }
}
