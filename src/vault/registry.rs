//! Vault Registry
//!
//! Tracks collateral and the hidden obligation of every vault. The
//! obligation itself is only ever learned through balance proofs; between
//! proofs the registry keeps a running value commitment (issued minus
//! redeemed) that the next proof must be made over.
//!
//! Exchange rate updates do not rescan vaults. Under-collateralization
//! surfaces on the vault's next balance proof or an explicit
//! [`VaultRegistry::check_liquidation`].

use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::error::ErrorKind;
use crate::common::logging::{log_security_event, log_vault_event};
use crate::crypto::groth16::{
    accepts, field_from_hash, field_from_u128, ProofVerifier, VerificationKeyId,
};
use crate::crypto::{ShieldedAddress, ValueCommitment};
use crate::types::{AccountId, BalanceProof, Hash32, Journal, StateChange, Vault, VaultId};

/// Registry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultConfig {
    pub collateral_ratio_num: u128,
    pub collateral_ratio_den: u128,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            collateral_ratio_num: 150,
            collateral_ratio_den: 100,
        }
    }
}

impl VaultConfig {
    /// `amount * rate * num / den`, floored; `None` on overflow
    pub fn required_for(&self, amount: u128, exchange_rate: u128) -> Option<u128> {
        amount
            .checked_mul(exchange_rate)?
            .checked_mul(self.collateral_ratio_num)?
            .checked_div(self.collateral_ratio_den)
    }
}

/// Vault registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("account {0} already owns a vault")]
    AlreadyRegistered(VaultId),

    #[error("shielded address {0} is bound to an active vault")]
    AddressInUse(Hash32),

    #[error("vault {0} not found")]
    NotFound(VaultId),

    #[error("vault {0} is not active")]
    Inactive(VaultId),

    #[error("caller {0} is not the exchange rate oracle")]
    NotOracle(AccountId),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("exchange rate must be non-zero")]
    InvalidExchangeRate,

    #[error("collateral arithmetic overflow")]
    Overflow,

    #[error("collateral {collateral} below required {required}")]
    Undercollateralized { collateral: u128, required: u128 },

    #[error("balance proof made at rate {proof_rate}, current rate is {current}")]
    StaleExchangeRate { proof_rate: u128, current: u128 },

    #[error("balance proof is not over the vault's running commitment")]
    CommitmentMismatch,

    #[error("vault {0} has issued or redeemed since its last balance proof")]
    StaleBalanceProof(VaultId),

    #[error("balance proof rejected")]
    InvalidProof,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::ZeroAmount | VaultError::InvalidExchangeRate => ErrorKind::MalformedInput,
            VaultError::AlreadyRegistered(_)
            | VaultError::AddressInUse(_)
            | VaultError::NotFound(_)
            | VaultError::Inactive(_)
            | VaultError::StaleExchangeRate { .. }
            | VaultError::StaleBalanceProof(_) => ErrorKind::PreconditionViolation,
            VaultError::NotOracle(_) => ErrorKind::Unauthorized,
            VaultError::Overflow | VaultError::Undercollateralized { .. } => {
                ErrorKind::EconomicFailure
            }
            VaultError::CommitmentMismatch | VaultError::InvalidProof => {
                ErrorKind::CryptographicRejection
            }
        }
    }

    /// Vault errors depend on the caller changing something first
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Registry of all vaults, keyed by owner account
pub struct VaultRegistry {
    config: VaultConfig,
    vaults: BTreeMap<VaultId, Vault>,
    exchange_rate: u128,
    oracle: AccountId,
    verifier: Arc<dyn ProofVerifier>,
    journal: Journal,
}

impl VaultRegistry {
    pub fn new(
        config: VaultConfig,
        oracle: AccountId,
        exchange_rate: u128,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Self {
        let mut journal = Journal::new();
        journal.record(StateChange::ExchangeRate);
        Self {
            config,
            vaults: BTreeMap::new(),
            exchange_rate,
            oracle,
            verifier,
            journal,
        }
    }

    /// Rebuild from persisted vaults and rate
    pub fn restore(
        config: VaultConfig,
        oracle: AccountId,
        exchange_rate: u128,
        verifier: Arc<dyn ProofVerifier>,
        vaults: Vec<Vault>,
    ) -> Self {
        Self {
            config,
            vaults: vaults.into_iter().map(|v| (v.id, v)).collect(),
            exchange_rate,
            oracle,
            verifier,
            journal: Journal::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Registration and collateral
    // ------------------------------------------------------------------------

    /// Register the caller as a vault with an initial deposit.
    ///
    /// A liquidated vault keeps its record. Registering it again reactivates
    /// it under the new address with the deposit added to what it still
    /// holds; its obligation carries over.
    pub fn register(
        &mut self,
        caller: &AccountId,
        address: ShieldedAddress,
        initial_collateral: u128,
    ) -> Result<&Vault, VaultError> {
        if self.vaults.get(caller).map_or(false, |v| v.active) {
            return Err(VaultError::AlreadyRegistered(*caller));
        }
        let address_hash = address.fingerprint();
        if self
            .vaults
            .values()
            .any(|v| v.active && v.address_hash == address_hash)
        {
            return Err(VaultError::AddressInUse(address_hash));
        }

        let vault = match self.vaults.get(caller) {
            Some(previous) => {
                let collateral = previous
                    .collateral
                    .checked_add(initial_collateral)
                    .ok_or(VaultError::Overflow)?;
                let required = self
                    .config
                    .required_for(previous.obligation, self.exchange_rate)
                    .ok_or(VaultError::Overflow)?;
                if collateral < required {
                    return Err(VaultError::Undercollateralized {
                        collateral,
                        required,
                    });
                }
                Vault {
                    address,
                    address_hash,
                    collateral,
                    accepts_issue: true,
                    accepts_redeem: true,
                    active: true,
                    ..previous.clone()
                }
            }
            None => Vault::new(*caller, address, initial_collateral, self.exchange_rate),
        };

        self.journal.record(StateChange::Vault(*caller));
        info!(
            target: "zbridge::vault",
            vault = %caller,
            collateral = vault.collateral,
            obligation = %vault.obligation,
            "Vault registered"
        );

        self.vaults.insert(*caller, vault);
        self.vaults
            .get(caller)
            .ok_or(VaultError::NotFound(*caller))
    }

    pub fn add_collateral(&mut self, caller: &AccountId, amount: u128) -> Result<u128, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let vault = self.active_vault_mut(caller)?;
        let collateral = vault
            .collateral
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        vault.collateral = collateral;

        self.journal.record(StateChange::Vault(*caller));
        debug!(target: "zbridge::vault", vault = %caller, amount, collateral, "Collateral added");
        Ok(collateral)
    }

    /// Withdraw collateral; what remains must still cover the obligation.
    ///
    /// Only allowed while the last balance proof covers every issue and
    /// redeem the vault has taken part in.
    pub fn withdraw_collateral(
        &mut self,
        caller: &AccountId,
        amount: u128,
    ) -> Result<u128, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let required = self.required_collateral(caller)?;
        let vault = self.active_vault_mut(caller)?;
        if vault.obligation_commitment != vault.running_commitment {
            return Err(VaultError::StaleBalanceProof(*caller));
        }

        let remaining = vault.collateral.checked_sub(amount).ok_or(
            VaultError::Undercollateralized {
                collateral: 0,
                required,
            },
        )?;
        if remaining < required {
            return Err(VaultError::Undercollateralized {
                collateral: remaining,
                required,
            });
        }
        vault.collateral = remaining;

        self.journal.record(StateChange::Vault(*caller));
        debug!(
            target: "zbridge::vault",
            vault = %caller,
            amount,
            remaining,
            "Collateral withdrawn"
        );
        Ok(remaining)
    }

    // ------------------------------------------------------------------------
    // Balance proofs and solvency
    // ------------------------------------------------------------------------

    /// Accept a proof of the vault's obligation.
    ///
    /// Returns whether the vault is still collateralized afterwards.
    pub fn submit_balance_proof(
        &mut self,
        caller: &AccountId,
        proof: BalanceProof,
    ) -> Result<bool, VaultError> {
        let current_rate = self.exchange_rate;
        let vault = self.active_vault(caller)?;

        if proof.exchange_rate != current_rate {
            return Err(VaultError::StaleExchangeRate {
                proof_rate: proof.exchange_rate,
                current: current_rate,
            });
        }
        if proof.commitment != vault.running_commitment {
            log_security_event(
                "balance_proof_commitment_mismatch",
                false,
                serde_json::json!({ "vault": caller.to_string() }),
                None,
            );
            return Err(VaultError::CommitmentMismatch);
        }

        let inputs = [
            field_from_u128(proof.obligation),
            proof.commitment.to_bytes(),
            field_from_u128(proof.exchange_rate),
            field_from_hash(&vault.address_hash),
        ];
        if !accepts(
            self.verifier.as_ref(),
            &proof.proof,
            &inputs,
            VerificationKeyId::BalanceProof,
        ) {
            log_security_event(
                "balance_proof_rejected",
                false,
                serde_json::json!({ "vault": caller.to_string() }),
                None,
            );
            return Err(VaultError::InvalidProof);
        }

        let required = self
            .config
            .required_for(proof.obligation, current_rate)
            .ok_or(VaultError::Overflow)?;

        let vault = self.active_vault_mut(caller)?;
        vault.obligation = proof.obligation;
        vault.obligation_commitment = proof.commitment;
        vault.last_exchange_rate = proof.exchange_rate;
        let collateralized = vault.collateral >= required;

        self.journal.record(StateChange::Vault(*caller));
        log_vault_event(
            "balance_proof_accepted",
            &caller.to_string(),
            serde_json::json!({
                "obligation": proof.obligation.to_string(),
                "required": required.to_string(),
                "collateralized": collateralized,
            }),
        );
        Ok(collateralized)
    }

    /// `obligation * exchange_rate * ratio`, at the current rate
    pub fn required_collateral(&self, vault_id: &VaultId) -> Result<u128, VaultError> {
        let vault = self.get_vault(vault_id).ok_or(VaultError::NotFound(*vault_id))?;
        self.config
            .required_for(vault.obligation, self.exchange_rate)
            .ok_or(VaultError::Overflow)
    }

    /// Inclusive: collateral exactly at the requirement is enough
    pub fn is_collateralized(&self, vault_id: &VaultId) -> Result<bool, VaultError> {
        let required = self.required_collateral(vault_id)?;
        let vault = self.get_vault(vault_id).ok_or(VaultError::NotFound(*vault_id))?;
        Ok(vault.collateral >= required)
    }

    pub fn update_exchange_rate(
        &mut self,
        caller: &AccountId,
        exchange_rate: u128,
    ) -> Result<(), VaultError> {
        if *caller != self.oracle {
            return Err(VaultError::NotOracle(*caller));
        }
        if exchange_rate == 0 {
            return Err(VaultError::InvalidExchangeRate);
        }
        let previous = std::mem::replace(&mut self.exchange_rate, exchange_rate);
        self.journal.record(StateChange::ExchangeRate);
        info!(
            target: "zbridge::vault",
            previous = previous,
            current = exchange_rate,
            "Exchange rate updated"
        );
        Ok(())
    }

    /// Deactivate the vault if it is under-collateralized. Anyone may call.
    ///
    /// Returns whether the vault was liquidated by this call.
    pub fn check_liquidation(&mut self, vault_id: &VaultId) -> Result<bool, VaultError> {
        let collateralized = self.is_collateralized(vault_id)?;
        let required = self.required_collateral(vault_id)?;
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(VaultError::NotFound(*vault_id))?;

        if !vault.active || collateralized {
            return Ok(false);
        }

        vault.active = false;
        let collateral = vault.collateral;
        self.journal.record(StateChange::Vault(*vault_id));
        warn!(
            target: "zbridge::vault",
            vault = %vault_id,
            collateral,
            required,
            "Vault liquidated"
        );
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Flags and queries
    // ------------------------------------------------------------------------

    pub fn set_accepts_issue(&mut self, caller: &AccountId, accepts: bool) -> Result<(), VaultError> {
        self.active_vault_mut(caller)?.accepts_issue = accepts;
        self.journal.record(StateChange::Vault(*caller));
        Ok(())
    }

    pub fn set_accepts_redeem(
        &mut self,
        caller: &AccountId,
        accepts: bool,
    ) -> Result<(), VaultError> {
        self.active_vault_mut(caller)?.accepts_redeem = accepts;
        self.journal.record(StateChange::Vault(*caller));
        Ok(())
    }

    /// Active vaults accepting issue requests, in id order
    pub fn available_vaults(&self) -> Vec<&Vault> {
        self.vaults
            .values()
            .filter(|v| v.is_available_for_issue())
            .collect()
    }

    pub fn get_vault(&self, vault_id: &VaultId) -> Option<&Vault> {
        self.vaults.get(vault_id)
    }

    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values()
    }

    pub fn exchange_rate(&self) -> u128 {
        self.exchange_rate
    }

    pub fn oracle(&self) -> AccountId {
        self.oracle
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub(crate) fn active_vault(&self, vault_id: &VaultId) -> Result<&Vault, VaultError> {
        let vault = self.vaults.get(vault_id).ok_or(VaultError::NotFound(*vault_id))?;
        if !vault.active {
            return Err(VaultError::Inactive(*vault_id));
        }
        Ok(vault)
    }

    fn active_vault_mut(&mut self, vault_id: &VaultId) -> Result<&mut Vault, VaultError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(VaultError::NotFound(*vault_id))?;
        if !vault.active {
            return Err(VaultError::Inactive(*vault_id));
        }
        Ok(vault)
    }

    // ------------------------------------------------------------------------
    // Bridge-internal bookkeeping
    // ------------------------------------------------------------------------

    /// Add an issued value commitment to the vault's running obligation
    pub(crate) fn record_issue(
        &mut self,
        vault_id: &VaultId,
        cv: &ValueCommitment,
    ) -> Result<(), VaultError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(VaultError::NotFound(*vault_id))?;
        vault.running_commitment += *cv;
        self.journal.record(StateChange::Vault(*vault_id));
        Ok(())
    }

    /// Remove a redeemed value commitment from the running obligation
    pub(crate) fn record_redeem(
        &mut self,
        vault_id: &VaultId,
        cv: &ValueCommitment,
    ) -> Result<(), VaultError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(VaultError::NotFound(*vault_id))?;
        vault.running_commitment -= *cv;
        self.journal.record(StateChange::Vault(*vault_id));
        Ok(())
    }

    /// Take up to `amount` of collateral. Returns what was actually taken.
    pub(crate) fn slash(&mut self, vault_id: &VaultId, amount: u128) -> Result<u128, VaultError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(VaultError::NotFound(*vault_id))?;
        let taken = amount.min(vault.collateral);
        vault.collateral -= taken;

        self.journal.record(StateChange::Vault(*vault_id));
        warn!(
            target: "zbridge::vault",
            vault = %vault_id,
            requested = amount,
            taken,
            remaining = vault.collateral,
            "Collateral slashed"
        );
        Ok(taken)
    }

    pub(crate) fn drain_changes(&mut self) -> Vec<StateChange> {
        self.journal.drain()
    }
}
