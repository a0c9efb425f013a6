//! Redeem Types
//!
//! Lifecycle of one redeem: `none -> awaiting_release -> {confirmed |
//! challenged | claimed}`.

use serde::{Deserialize, Serialize};

use super::primitives::{AccountId, Hash32, VaultId};
use crate::crypto::{Blinding, ValueCommitment};

/// Status of a burn waiting for its backing-chain release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemStatus {
    None,
    /// Tokens burned, vault must release before the deadline
    AwaitingRelease,
    /// Vault proved the release
    Confirmed,
    /// Vault proved the destination unusable
    Challenged,
    /// Deadline passed; redeemer took collateral instead
    Claimed,
}

impl Default for RedeemStatus {
    fn default() -> Self {
        Self::None
    }
}

impl RedeemStatus {
    pub fn can_transition_to(&self, next: RedeemStatus) -> bool {
        matches!(
            (self, next),
            (Self::None, Self::AwaitingRelease)
                | (Self::AwaitingRelease, Self::Confirmed)
                | (Self::AwaitingRelease, Self::Challenged)
                | (Self::AwaitingRelease, Self::Claimed)
        )
    }
}

impl std::fmt::Display for RedeemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::AwaitingRelease => "awaiting_release",
            Self::Confirmed => "confirmed",
            Self::Challenged => "challenged",
            Self::Claimed => "claimed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RedeemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "awaiting_release" => Ok(Self::AwaitingRelease),
            "confirmed" => Ok(Self::Confirmed),
            "challenged" => Ok(Self::Challenged),
            "claimed" => Ok(Self::Claimed),
            _ => Err(format!("unknown redeem status: {}", s)),
        }
    }
}

/// A burn of wrapped tokens awaiting release on the backing chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRequest {
    pub nonce: u64,
    pub burner: AccountId,
    pub vault: VaultId,
    pub amount: u64,
    pub fee: u64,
    pub cv: ValueCommitment,
    pub cvn: ValueCommitment,
    /// Note the vault has to create on the backing chain
    pub requested_note_commitment: Hash32,
    /// Destination address, encrypted to the vault
    pub encrypted_destination: Vec<u8>,
    pub requested_at: u64,
    pub deadline: u64,
    pub status: RedeemStatus,
}

impl BurnRequest {
    /// Claimable strictly after the deadline
    pub fn is_overdue(&self, now: u64) -> bool {
        now > self.deadline
    }
}

/// Redeemer's burn submission
#[derive(Debug, Clone)]
pub struct BurnTransfer {
    pub vault: VaultId,
    pub amount: u64,
    /// Commitment to `amount`
    pub cv: ValueCommitment,
    pub amount_blinding: Blinding,
    /// Commitment to the amount net of the fee
    pub cvn: ValueCommitment,
    pub fee_blinding: Blinding,
    pub requested_note_commitment: Hash32,
    pub encrypted_destination: Vec<u8>,
}
