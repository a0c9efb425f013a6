//! Redeem Flow
//!
//! `burn -> {confirm_redeem | challenge_redeem | claim_collateral}`.
//!
//! Burned tokens leave the vault's running obligation on every resolution:
//! the supply they backed no longer exists, whether the vault released the
//! value, proved the destination unusable, or was slashed instead.

use tracing::{info, warn};

use super::orchestrator::Bridge;
use super::types::BridgeError;
use crate::common::logging::{log_redeem_event, log_security_event};
use crate::crypto::groth16::{accepts, field_from_hash, VerificationKeyId};
use crate::crypto::{
    ciphertext_digest, verify_conservation, verify_value_commitment, Groth16Proof, MerkleProof,
};
use crate::types::{
    AccountId, BlockHash, BurnRequest, BurnTransfer, Hash32, RedeemStatus, StateChange,
};

impl Bridge {
    /// Burn wrapped tokens and ask a vault to release the backing value.
    ///
    /// Returns the burn nonce.
    pub fn burn(
        &mut self,
        caller: &AccountId,
        transfer: BurnTransfer,
        now: u64,
    ) -> Result<u64, BridgeError> {
        if transfer.amount == 0 {
            return Err(BridgeError::ZeroAmount);
        }
        self.vaults
            .get_vault(&transfer.vault)
            .filter(|v| v.is_available_for_redeem())
            .ok_or(BridgeError::VaultUnavailable(transfer.vault))?;

        if !verify_value_commitment(&transfer.cv, transfer.amount, &transfer.amount_blinding) {
            return Err(BridgeError::ValueCommitmentMismatch);
        }
        let fee = self.config.fee_for(transfer.amount);
        if !verify_conservation(&transfer.cv, &transfer.cvn, fee, &transfer.fee_blinding) {
            return Err(BridgeError::ConservationFailed { fee });
        }

        let nonce = self.counters.next_burn;
        let next = nonce.checked_add(1).ok_or(BridgeError::Overflow)?;
        let deadline = now
            .checked_add(self.config.release_window_secs)
            .ok_or(BridgeError::Overflow)?;

        // Last check, first mutation: the ledger rejects without side effects
        self.token.burn(caller, transfer.amount)?;

        self.burns.insert(
            nonce,
            BurnRequest {
                nonce,
                burner: *caller,
                vault: transfer.vault,
                amount: transfer.amount,
                fee,
                cv: transfer.cv,
                cvn: transfer.cvn,
                requested_note_commitment: transfer.requested_note_commitment,
                encrypted_destination: transfer.encrypted_destination,
                requested_at: now,
                deadline,
                status: RedeemStatus::AwaitingRelease,
            },
        );
        self.counters.next_burn = next;

        self.journal.record(StateChange::Burn(nonce));
        self.journal.record(StateChange::Counters);
        log_redeem_event(
            "burn_recorded",
            nonce,
            &transfer.vault.to_string(),
            transfer.amount,
            true,
            None,
        );
        info!(
            target: "zbridge::redeem",
            nonce,
            burner = %caller,
            amount = transfer.amount,
            fee,
            deadline,
            "Awaiting release"
        );
        Ok(nonce)
    }

    /// Vault proves the requested note landed in a confirmed block
    pub fn confirm_redeem(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        note_commitment: &Hash32,
        block_hash: &BlockHash,
        proof: &MerkleProof,
    ) -> Result<(), BridgeError> {
        let burn = self.awaiting_release(nonce, RedeemStatus::Confirmed)?;
        if burn.vault != *caller {
            return Err(BridgeError::NotVaultOwner(nonce));
        }
        if *note_commitment != burn.requested_note_commitment {
            return Err(BridgeError::ReleasedNoteMismatch);
        }
        if !self
            .relay
            .verify_note_commitment(block_hash, note_commitment, proof)?
        {
            return Err(BridgeError::InclusionFailed);
        }

        let cv = burn.cv;
        let amount = burn.amount;
        self.vaults.record_redeem(caller, &cv)?;
        self.resolve_burn(nonce, RedeemStatus::Confirmed);

        log_redeem_event("redeem_confirmed", nonce, &caller.to_string(), amount, true, None);
        Ok(())
    }

    /// Vault proves the encrypted destination does not decrypt to a usable
    /// address. The redeemer gets nothing back.
    pub fn challenge_redeem(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        revealed: &Groth16Proof,
    ) -> Result<(), BridgeError> {
        let burn = self.awaiting_release(nonce, RedeemStatus::Challenged)?;
        if burn.vault != *caller {
            return Err(BridgeError::NotVaultOwner(nonce));
        }
        let vault = self
            .vaults
            .get_vault(caller)
            .ok_or(BridgeError::VaultUnavailable(*caller))?;

        let inputs = [
            field_from_hash(&ciphertext_digest(&burn.encrypted_destination)),
            field_from_hash(&burn.requested_note_commitment),
            field_from_hash(&vault.address_hash),
        ];
        if !accepts(
            self.verifier.as_ref(),
            revealed,
            &inputs,
            VerificationKeyId::RedeemChallenge,
        ) {
            return Err(BridgeError::InvalidProof(VerificationKeyId::RedeemChallenge));
        }

        let cv = burn.cv;
        let amount = burn.amount;
        let burner = burn.burner;
        self.vaults.record_redeem(caller, &cv)?;
        self.resolve_burn(nonce, RedeemStatus::Challenged);

        log_security_event(
            "redeem_challenged",
            true,
            serde_json::json!({ "nonce": nonce, "burner": burner.to_string(), "amount": amount }),
            Some(&format!("redeem-{}", nonce)),
        );
        Ok(())
    }

    /// Redeemer takes vault collateral after a missed release deadline
    pub fn claim_collateral(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        now: u64,
    ) -> Result<u128, BridgeError> {
        let burn = self.awaiting_release(nonce, RedeemStatus::Claimed)?;
        if burn.burner != *caller {
            return Err(BridgeError::NotRedeemer(nonce));
        }
        if !burn.is_overdue(now) {
            return Err(BridgeError::DeadlineNotReached {
                nonce,
                deadline: burn.deadline,
            });
        }

        let vault_id = burn.vault;
        let cv = burn.cv;
        let amount = burn.amount;
        let owed = self
            .vaults
            .config()
            .required_for(u128::from(amount), self.vaults.exchange_rate())
            .ok_or(BridgeError::Overflow)?;

        let taken = self.vaults.slash(&vault_id, owed)?;
        self.vaults.record_redeem(&vault_id, &cv)?;
        self.credit(caller, taken);
        self.resolve_burn(nonce, RedeemStatus::Claimed);

        log_redeem_event("collateral_claimed", nonce, &vault_id.to_string(), amount, true, None);
        warn!(
            target: "zbridge::redeem",
            nonce,
            vault = %vault_id,
            owed,
            taken,
            "Vault missed release deadline"
        );
        Ok(taken)
    }

    /// Burn that may resolve to `next`
    fn awaiting_release(
        &self,
        nonce: u64,
        next: RedeemStatus,
    ) -> Result<&BurnRequest, BridgeError> {
        let burn = self
            .burns
            .get(&nonce)
            .ok_or(BridgeError::BurnNotFound(nonce))?;
        if !burn.status.can_transition_to(next) {
            return Err(BridgeError::WrongRedeemStatus {
                nonce,
                status: burn.status,
            });
        }
        Ok(burn)
    }

    fn resolve_burn(&mut self, nonce: u64, status: RedeemStatus) {
        if let Some(burn) = self.burns.get_mut(&nonce) {
            debug_assert!(
                burn.status.can_transition_to(status),
                "burn {} cannot move from {} to {}",
                nonce,
                burn.status,
                status
            );
            if burn.status.can_transition_to(status) {
                burn.status = status;
            }
        }
        self.journal.record(StateChange::Burn(nonce));
        info!(target: "zbridge::redeem", nonce, status = %status, "Redeem resolved");
    }
}
