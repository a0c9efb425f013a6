//! Vault Types

use serde::{Deserialize, Serialize};

use super::primitives::{Hash32, VaultId};
use crate::crypto::groth16::Groth16Proof;
use crate::crypto::{ShieldedAddress, ValueCommitment};

/// Collateralized intermediary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Owner account, doubles as the vault id
    pub id: VaultId,
    /// Where requesters send backing-chain value
    pub address: ShieldedAddress,
    pub address_hash: Hash32,
    pub collateral: u128,
    /// Obligation proven by the last accepted balance proof
    pub obligation: u128,
    /// Commitment the last balance proof was made over
    pub obligation_commitment: ValueCommitment,
    /// Sum of issued minus redeemed value commitments
    pub running_commitment: ValueCommitment,
    /// Exchange rate of the last accepted balance proof
    pub last_exchange_rate: u128,
    pub accepts_issue: bool,
    pub accepts_redeem: bool,
    /// Cleared on liquidation, set again when the owner re-registers
    pub active: bool,
}

impl Vault {
    pub fn new(id: VaultId, address: ShieldedAddress, collateral: u128, exchange_rate: u128) -> Self {
        Self {
            id,
            address,
            address_hash: address.fingerprint(),
            collateral,
            obligation: 0,
            obligation_commitment: ValueCommitment::identity(),
            running_commitment: ValueCommitment::identity(),
            last_exchange_rate: exchange_rate,
            accepts_issue: true,
            accepts_redeem: true,
            active: true,
        }
    }

    pub fn is_available_for_issue(&self) -> bool {
        self.active && self.accepts_issue
    }

    pub fn is_available_for_redeem(&self) -> bool {
        self.active && self.accepts_redeem
    }
}

/// Vault attestation of its obligation
#[derive(Debug, Clone)]
pub struct BalanceProof {
    pub obligation: u128,
    /// Must equal the vault's running commitment
    pub commitment: ValueCommitment,
    /// Must equal the registry's current rate
    pub exchange_rate: u128,
    pub proof: Groth16Proof,
}
