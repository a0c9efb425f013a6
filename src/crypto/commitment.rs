//! Commitment Engine
//!
//! Note commitments and nullifiers are personalized BLAKE2b digests. The
//! note randomness is not free: it is derived from the lock permit, so a note
//! can only satisfy the permit it was built for.
//!
//! Value commitments are Pedersen commitments over Ristretto,
//! `cv = [v]G + [r]H`, with `H` hashed to the group so nobody knows its
//! discrete log relative to `G`. They add up, which is what the bridge needs
//! to check `cv_in == cv_out + cv_fee` and to track vault obligations without
//! opening anything.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::sync::OnceLock;

use super::hash::{
    hash256_personalized, hash256_personalized_parts, ADDRESS_PERSONALIZATION,
    BLINDING_PERSONALIZATION, NOTE_COMMITMENT_PERSONALIZATION, NULLIFIER_PERSONALIZATION,
};
use crate::types::Hash32;

/// Hash-to-group input for the blinding generator `H`
const VALUE_COMMITMENT_H_DOMAIN: &[u8] = b"zbridge:value-commitment:H";

/// Diversifier length of a shielded address
pub const DIVERSIFIER_LEN: usize = 11;

// ============================================================================
// Shielded addresses
// ============================================================================

/// Backing-chain shielded payment address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedAddress {
    /// Diversifier
    pub d: [u8; DIVERSIFIER_LEN],
    /// Diversified transmission key
    pub pk_d: [u8; 32],
}

impl ShieldedAddress {
    pub fn new(d: [u8; DIVERSIFIER_LEN], pk_d: [u8; 32]) -> Self {
        Self { d, pk_d }
    }

    /// Public fingerprint of the address, stored on the vault
    pub fn fingerprint(&self) -> Hash32 {
        hash256_personalized_parts(&[&self.d, &self.pk_d], ADDRESS_PERSONALIZATION)
    }
}

// ============================================================================
// Note commitments and nullifiers
// ============================================================================

/// Derive the note randomness bound to one lock permit
pub fn derive_blinding_factor(permit_nonce: u64, user_key: &[u8; 32]) -> Hash32 {
    hash256_personalized_parts(
        &[&permit_nonce.to_le_bytes(), user_key],
        BLINDING_PERSONALIZATION,
    )
}

/// `cm = H("ZBridge_NoteComm", d || pk_d || value || rcm)`
pub fn compute_note_commitment(
    d: &[u8; DIVERSIFIER_LEN],
    pk_d: &[u8; 32],
    value: u64,
    rcm: &Hash32,
) -> Hash32 {
    hash256_personalized_parts(
        &[d, pk_d, &value.to_le_bytes(), rcm.as_bytes()],
        NOTE_COMMITMENT_PERSONALIZATION,
    )
}

/// Check that `commitment` is a note of `value` to the vault's address whose
/// randomness was derived from this permit.
pub fn verify_note_commitment(
    commitment: &Hash32,
    vault_d: &[u8; DIVERSIFIER_LEN],
    vault_pk_d: &[u8; 32],
    value: u64,
    permit_nonce: u64,
    user_key: &[u8; 32],
) -> bool {
    let rcm = derive_blinding_factor(permit_nonce, user_key);
    compute_note_commitment(vault_d, vault_pk_d, value, &rcm) == *commitment
}

/// One-time spend marker for a note at `position`
pub fn compute_nullifier(note_commitment: &Hash32, position: u64, spend_key: &[u8; 32]) -> Hash32 {
    hash256_personalized_parts(
        &[spend_key, note_commitment.as_bytes(), &position.to_le_bytes()],
        NULLIFIER_PERSONALIZATION,
    )
}

/// Digest of an opaque ciphertext (encrypted notes and destinations)
pub fn ciphertext_digest(ciphertext: &[u8]) -> Hash32 {
    hash256_personalized(ciphertext, super::hash::CIPHERTEXT_PERSONALIZATION)
}

// ============================================================================
// Value commitments
// ============================================================================

fn blinding_generator() -> &'static RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    H.get_or_init(|| RistrettoPoint::hash_from_bytes::<Sha512>(VALUE_COMMITMENT_H_DOMAIN))
}

/// Pedersen blinding scalar `r`
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blinding(Scalar);

impl Blinding {
    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// Reduce 32 bytes modulo the group order
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Scalar::from_bytes_mod_order(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl fmt::Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Blinding(..)")
    }
}

impl Add for Blinding {
    type Output = Blinding;

    fn add(self, rhs: Blinding) -> Blinding {
        Blinding(self.0 + rhs.0)
    }
}

impl Sub for Blinding {
    type Output = Blinding;

    fn sub(self, rhs: Blinding) -> Blinding {
        Blinding(self.0 - rhs.0)
    }
}

/// Pedersen value commitment `cv = [v]G + [r]H`
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCommitment(RistrettoPoint);

impl ValueCommitment {
    /// Commitment to zero with zero blinding (the group identity)
    pub fn identity() -> Self {
        Self(RistrettoPoint::identity())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    /// Decode a compressed commitment; `None` if the bytes are not a point
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        CompressedRistretto(bytes).decompress().map(Self)
    }
}

impl Default for ValueCommitment {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for ValueCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCommitment({})", hex::encode(self.to_bytes()))
    }
}

impl Add for ValueCommitment {
    type Output = ValueCommitment;

    fn add(self, rhs: ValueCommitment) -> ValueCommitment {
        ValueCommitment(self.0 + rhs.0)
    }
}

impl Sub for ValueCommitment {
    type Output = ValueCommitment;

    fn sub(self, rhs: ValueCommitment) -> ValueCommitment {
        ValueCommitment(self.0 - rhs.0)
    }
}

impl Neg for ValueCommitment {
    type Output = ValueCommitment;

    fn neg(self) -> ValueCommitment {
        ValueCommitment(-self.0)
    }
}

impl AddAssign for ValueCommitment {
    fn add_assign(&mut self, rhs: ValueCommitment) {
        self.0 += rhs.0;
    }
}

impl SubAssign for ValueCommitment {
    fn sub_assign(&mut self, rhs: ValueCommitment) {
        self.0 -= rhs.0;
    }
}

/// `cv = [value]G + [blinding]H`
pub fn compute_value_commitment(value: u64, blinding: &Blinding) -> ValueCommitment {
    let v = Scalar::from(value);
    ValueCommitment(RISTRETTO_BASEPOINT_POINT * v + blinding_generator() * blinding.0)
}

/// Check an opening of `cv`
pub fn verify_value_commitment(cv: &ValueCommitment, value: u64, blinding: &Blinding) -> bool {
    compute_value_commitment(value, blinding) == *cv
}

/// Check `cv_in == cv_out + commit(fee, fee_blinding)` without opening
/// `cv_in` or `cv_out`.
pub fn verify_conservation(
    cv_in: &ValueCommitment,
    cv_out: &ValueCommitment,
    fee: u64,
    fee_blinding: &Blinding,
) -> bool {
    *cv_in == *cv_out + compute_value_commitment(fee, fee_blinding)
}
