//! Issue Types
//!
//! Lifecycle of one issue: `none -> awaiting_mint -> awaiting_confirmation ->
//! {confirmed | challenged}`, or `-> expired` from either waiting state.

use serde::{Deserialize, Serialize};

use super::primitives::{AccountId, BlockHash, Hash32, VaultId};
use crate::crypto::groth16::Groth16Proof;
use crate::crypto::merkle::MerkleProof;
use crate::crypto::{Blinding, ValueCommitment};

/// Status of an issue request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// No request under this nonce
    None,
    /// Permit issued, waiting for the requester's mint
    AwaitingMint,
    /// Mint recorded, waiting for the vault to confirm or challenge
    AwaitingConfirmation,
    /// Vault confirmed; wrapped tokens minted
    Confirmed,
    /// Vault proved the payment was malformed
    Challenged,
    /// A deadline passed
    Expired,
}

impl Default for IssueStatus {
    fn default() -> Self {
        Self::None
    }
}

impl IssueStatus {
    /// Whether moving to `next` respects the lifecycle order
    pub fn can_transition_to(&self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::AwaitingMint)
                | (Self::AwaitingMint, Self::AwaitingConfirmation)
                | (Self::AwaitingMint, Self::Expired)
                | (Self::AwaitingConfirmation, Self::Confirmed)
                | (Self::AwaitingConfirmation, Self::Challenged)
                | (Self::AwaitingConfirmation, Self::Expired)
        )
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::AwaitingMint => "awaiting_mint",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Confirmed => "confirmed",
            Self::Challenged => "challenged",
            Self::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "awaiting_mint" => Ok(Self::AwaitingMint),
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "confirmed" => Ok(Self::Confirmed),
            "challenged" => Ok(Self::Challenged),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("unknown issue status: {}", s)),
        }
    }
}

/// Ticket binding one future backing-chain payment to one mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPermit {
    /// Unique, monotonically increasing
    pub nonce: u64,
    pub requester: AccountId,
    pub vault: VaultId,
    /// Fingerprint of the vault's shielded address at request time
    pub vault_address_hash: Hash32,
    /// Requester key mixed into the note randomness
    pub user_key: [u8; 32],
    pub issued_at: u64,
    pub expires_at: u64,
    pub used: bool,
}

impl LockPermit {
    /// Expired means strictly past `expires_at`
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// A mint claim waiting for the vault's verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRecord {
    pub permit_nonce: u64,
    pub requester: AccountId,
    pub vault: VaultId,
    /// Commitment to the full paid value
    pub cv: ValueCommitment,
    /// Commitment to the value net of the fee
    pub cvn: ValueCommitment,
    pub value: u64,
    pub fee: u64,
    pub note_commitment: Hash32,
    pub block_hash: BlockHash,
    /// Digest of the note ciphertext the vault must decrypt
    pub encrypted_note_digest: Hash32,
    pub submitted_at: u64,
}

/// Everything the bridge keeps about one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub permit: LockPermit,
    pub mint: Option<MintRecord>,
    pub status: IssueStatus,
    /// Deposit posted by the requester
    pub requester_warranty: u128,
    /// Vault collateral earmarked against a non-responding vault
    pub vault_warranty: u128,
}

impl IssueRequest {
    pub fn nonce(&self) -> u64 {
        self.permit.nonce
    }
}

/// Requester's mint submission
#[derive(Debug, Clone)]
pub struct MintTransfer {
    pub value: u64,
    pub cv: ValueCommitment,
    pub cvn: ValueCommitment,
    /// Blinding of the fee commitment, `cv - cvn = commit(fee, fee_blinding)`
    pub fee_blinding: Blinding,
    pub note_commitment: Hash32,
    pub block_hash: BlockHash,
    /// Path of the note commitment in the block's sapling tree
    pub inclusion_proof: MerkleProof,
    pub encrypted_note: Vec<u8>,
    pub proof: Groth16Proof,
}

/// Opening a vault reveals to show that the delivered note is not the one
/// the permit asked for
#[derive(Debug, Clone)]
pub struct RevealedSecret {
    pub value: u64,
    pub rcm: Hash32,
    /// Binds the opening to the recorded note ciphertext
    pub proof: Groth16Proof,
}
