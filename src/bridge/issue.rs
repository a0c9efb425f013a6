//! Issue Flow
//!
//! `request_lock -> mint -> {confirm_issue | challenge_issue}`, with
//! `expire_issue` as the timeout path out of either waiting state.
//!
//! The requester pays a vault on the backing chain with a note whose
//! randomness is derived from the permit, so one payment can only ever back
//! the permit it was made for.

use tracing::{debug, info, warn};

use super::orchestrator::Bridge;
use super::types::BridgeError;
use crate::common::logging::{log_issue_event, log_security_event};
use crate::crypto::groth16::{accepts, field_from_hash, field_from_u64, VerificationKeyId};
use crate::crypto::{
    ciphertext_digest, compute_note_commitment, verify_conservation, verify_note_commitment,
};
use crate::types::{
    AccountId, IssueRequest, IssueStatus, LockPermit, MintRecord, MintTransfer, RevealedSecret,
    StateChange, VaultId,
};

impl Bridge {
    /// Reserve a vault for one deposit and hand out a permit for it.
    ///
    /// Returns the permit nonce.
    pub fn request_lock(
        &mut self,
        caller: &AccountId,
        vault_id: &VaultId,
        user_key: [u8; 32],
        warranty: u128,
        now: u64,
    ) -> Result<u64, BridgeError> {
        let vault = self
            .vaults
            .get_vault(vault_id)
            .filter(|v| v.is_available_for_issue())
            .ok_or(BridgeError::VaultUnavailable(*vault_id))?;

        if warranty != self.config.requester_warranty {
            return Err(BridgeError::WrongWarranty {
                expected: self.config.requester_warranty,
                got: warranty,
            });
        }
        if vault.collateral < self.config.vault_warranty {
            return Err(BridgeError::InsufficientVaultCollateral {
                collateral: vault.collateral,
                required: self.config.vault_warranty,
            });
        }

        let nonce = self.counters.next_issue;
        let next = nonce.checked_add(1).ok_or(BridgeError::Overflow)?;
        let expires_at = now
            .checked_add(self.config.permit_ttl_secs)
            .ok_or(BridgeError::Overflow)?;

        let permit = LockPermit {
            nonce,
            requester: *caller,
            vault: *vault_id,
            vault_address_hash: vault.address_hash,
            user_key,
            issued_at: now,
            expires_at,
            used: false,
        };
        self.issues.insert(
            nonce,
            IssueRequest {
                permit,
                mint: None,
                status: IssueStatus::AwaitingMint,
                requester_warranty: warranty,
                vault_warranty: self.config.vault_warranty,
            },
        );
        self.counters.next_issue = next;

        self.journal.record(StateChange::Issue(nonce));
        self.journal.record(StateChange::Counters);
        info!(
            target: "zbridge::issue",
            nonce,
            requester = %caller,
            vault = %vault_id,
            expires_at,
            "Lock permit issued"
        );
        Ok(nonce)
    }

    /// Claim a backing-chain payment made under a permit
    pub fn mint(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        transfer: MintTransfer,
        now: u64,
    ) -> Result<(), BridgeError> {
        let issue = self
            .issues
            .get(&nonce)
            .ok_or(BridgeError::IssueNotFound(nonce))?;
        let permit = &issue.permit;

        if permit.requester != *caller {
            return Err(BridgeError::NotRequester(nonce));
        }
        if permit.used {
            return Err(BridgeError::PermitUsed(nonce));
        }
        if permit.is_expired(now) {
            return Err(BridgeError::PermitExpired {
                nonce,
                expires_at: permit.expires_at,
            });
        }
        if !issue.status.can_transition_to(IssueStatus::AwaitingConfirmation) {
            return Err(BridgeError::WrongIssueStatus {
                nonce,
                status: issue.status,
            });
        }
        if transfer.value == 0 {
            return Err(BridgeError::ZeroAmount);
        }

        let fee = self.config.fee_for(transfer.value);
        if !verify_conservation(&transfer.cv, &transfer.cvn, fee, &transfer.fee_blinding) {
            return Err(BridgeError::ConservationFailed { fee });
        }

        // Confirmation is checked inside; an unconfirmed block is retryable
        let included = self.relay.verify_note_commitment(
            &transfer.block_hash,
            &transfer.note_commitment,
            &transfer.inclusion_proof,
        )?;
        if !included {
            log_issue_event("mint_inclusion_failed", nonce, &permit.vault.to_string(), false, None);
            return Err(BridgeError::InclusionFailed);
        }

        let vault = self
            .vaults
            .get_vault(&permit.vault)
            .ok_or(BridgeError::VaultUnavailable(permit.vault))?;
        if vault.address_hash != permit.vault_address_hash {
            return Err(BridgeError::VaultAddressChanged(nonce));
        }
        if !verify_note_commitment(
            &transfer.note_commitment,
            &vault.address.d,
            &vault.address.pk_d,
            transfer.value,
            nonce,
            &permit.user_key,
        ) {
            return Err(BridgeError::NoteCommitmentMismatch);
        }

        let inputs = [
            transfer.cv.to_bytes(),
            transfer.cvn.to_bytes(),
            field_from_hash(&transfer.note_commitment),
            field_from_u64(nonce),
            field_from_hash(&permit.vault_address_hash),
            permit.user_key,
        ];
        if !accepts(
            self.verifier.as_ref(),
            &transfer.proof,
            &inputs,
            VerificationKeyId::Mint,
        ) {
            log_security_event(
                "mint_proof_rejected",
                false,
                serde_json::json!({ "nonce": nonce, "requester": caller.to_string() }),
                Some(&format!("issue-{}", nonce)),
            );
            return Err(BridgeError::InvalidProof(VerificationKeyId::Mint));
        }

        let record = MintRecord {
            permit_nonce: nonce,
            requester: *caller,
            vault: permit.vault,
            cv: transfer.cv,
            cvn: transfer.cvn,
            value: transfer.value,
            fee,
            note_commitment: transfer.note_commitment,
            block_hash: transfer.block_hash,
            encrypted_note_digest: ciphertext_digest(&transfer.encrypted_note),
            submitted_at: now,
        };

        let issue = self
            .issues
            .get_mut(&nonce)
            .ok_or(BridgeError::IssueNotFound(nonce))?;
        issue.permit.used = true;
        issue.mint = Some(record);
        advance_issue(issue, IssueStatus::AwaitingConfirmation);

        self.journal.record(StateChange::Issue(nonce));
        log_issue_event("mint_recorded", nonce, &issue.permit.vault.to_string(), true, None);
        debug!(
            target: "zbridge::issue",
            nonce,
            value = transfer.value,
            fee,
            block = %transfer.block_hash,
            "Mint awaiting vault confirmation"
        );
        Ok(())
    }

    /// Vault accepts the payment; the only path that creates wrapped supply.
    ///
    /// Shares the confirmation window with [`Bridge::challenge_issue`]; once
    /// it closes the issue can only expire.
    pub fn confirm_issue(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        now: u64,
    ) -> Result<(), BridgeError> {
        let (requester, vault_id, mint, warranty) = {
            let issue = self.awaiting_confirmation(caller, nonce, IssueStatus::Confirmed)?;
            let mint = issue
                .mint
                .clone()
                .ok_or(BridgeError::WrongIssueStatus {
                    nonce,
                    status: issue.status,
                })?;
            (
                issue.permit.requester,
                issue.permit.vault,
                mint,
                issue.requester_warranty,
            )
        };
        let closed_at = mint
            .submitted_at
            .saturating_add(self.config.confirmation_window_secs);
        if now > closed_at {
            return Err(BridgeError::ConfirmationWindowClosed { nonce, closed_at });
        }

        // Fee cannot exceed value, so only the token itself can fail here
        let net = mint.value - mint.fee;
        self.token.mint(&requester, net)?;
        if mint.fee > 0 {
            if let Err(e) = self.token.mint(&vault_id, mint.fee) {
                // keep the ledger unchanged on a rejected transition
                self.token.burn(&requester, net)?;
                return Err(e.into());
            }
        }
        self.vaults.record_issue(&vault_id, &mint.cv)?;
        self.credit(&requester, warranty);

        if let Some(issue) = self.issues.get_mut(&nonce) {
            advance_issue(issue, IssueStatus::Confirmed);
        }
        self.journal.record(StateChange::Issue(nonce));
        log_issue_event("issue_confirmed", nonce, &vault_id.to_string(), true, None);
        info!(
            target: "zbridge::issue",
            nonce,
            minted = net,
            fee = mint.fee,
            "Issue confirmed"
        );
        Ok(())
    }

    /// Vault shows the delivered note is not the one the mint claimed
    pub fn challenge_issue(
        &mut self,
        caller: &AccountId,
        nonce: u64,
        revealed: RevealedSecret,
        now: u64,
    ) -> Result<(), BridgeError> {
        let issue = self.awaiting_confirmation(caller, nonce, IssueStatus::Challenged)?;
        let (mint, requester, vault_id, warranty) = match &issue.mint {
            Some(mint) => (
                mint,
                issue.permit.requester,
                issue.permit.vault,
                issue.requester_warranty,
            ),
            None => {
                return Err(BridgeError::WrongIssueStatus {
                    nonce,
                    status: issue.status,
                })
            }
        };

        let closed_at = mint
            .submitted_at
            .saturating_add(self.config.confirmation_window_secs);
        if now > closed_at {
            return Err(BridgeError::ConfirmationWindowClosed { nonce, closed_at });
        }

        let vault = self
            .vaults
            .get_vault(&vault_id)
            .ok_or(BridgeError::VaultUnavailable(vault_id))?;
        let recomputed = compute_note_commitment(
            &vault.address.d,
            &vault.address.pk_d,
            revealed.value,
            &revealed.rcm,
        );
        if recomputed == mint.note_commitment {
            return Err(BridgeError::ChallengeUnfounded);
        }

        let inputs = [
            field_from_hash(&mint.encrypted_note_digest),
            field_from_hash(&recomputed),
            field_from_u64(revealed.value),
            field_from_hash(&revealed.rcm),
            field_from_hash(&vault.address_hash),
        ];
        if !accepts(
            self.verifier.as_ref(),
            &revealed.proof,
            &inputs,
            VerificationKeyId::IssueChallenge,
        ) {
            return Err(BridgeError::InvalidProof(VerificationKeyId::IssueChallenge));
        }

        self.credit(&vault_id, warranty);
        if let Some(issue) = self.issues.get_mut(&nonce) {
            issue.mint = None;
            advance_issue(issue, IssueStatus::Challenged);
        }
        self.journal.record(StateChange::Issue(nonce));
        log_security_event(
            "issue_challenged",
            true,
            serde_json::json!({ "nonce": nonce, "requester": requester.to_string() }),
            Some(&format!("issue-{}", nonce)),
        );
        warn!(
            target: "zbridge::issue",
            nonce,
            vault = %vault_id,
            forfeited = warranty,
            "Issue challenged, requester warranty forfeited"
        );
        Ok(())
    }

    /// Time out a waiting issue. Anyone may call.
    pub fn expire_issue(&mut self, nonce: u64, now: u64) -> Result<(), BridgeError> {
        let issue = self
            .issues
            .get(&nonce)
            .ok_or(BridgeError::IssueNotFound(nonce))?;
        if !issue.status.can_transition_to(IssueStatus::Expired) {
            return Err(BridgeError::WrongIssueStatus {
                nonce,
                status: issue.status,
            });
        }
        let deadline = self
            .issue_deadline(issue)
            .ok_or(BridgeError::WrongIssueStatus {
                nonce,
                status: issue.status,
            })?;
        if now <= deadline {
            return Err(BridgeError::DeadlineNotReached { nonce, deadline });
        }

        let status = issue.status;
        let requester = issue.permit.requester;
        let vault_id = issue.permit.vault;
        let requester_warranty = issue.requester_warranty;
        let vault_warranty = issue.vault_warranty;

        match status {
            IssueStatus::AwaitingMint => {
                // requester never paid: the vault kept capacity reserved
                self.credit(&vault_id, requester_warranty);
            }
            _ => {
                let slashed = self.vaults.slash(&vault_id, vault_warranty)?;
                self.credit(&requester, slashed);
                self.credit(&requester, requester_warranty);
            }
        }

        if let Some(issue) = self.issues.get_mut(&nonce) {
            advance_issue(issue, IssueStatus::Expired);
        }
        self.journal.record(StateChange::Issue(nonce));
        log_issue_event("issue_expired", nonce, &vault_id.to_string(), true, None);
        info!(target: "zbridge::issue", nonce, from = %status, "Issue expired");
        Ok(())
    }

    /// Issue whose vault is `caller` and that may resolve to `next`
    fn awaiting_confirmation(
        &self,
        caller: &AccountId,
        nonce: u64,
        next: IssueStatus,
    ) -> Result<&IssueRequest, BridgeError> {
        let issue = self
            .issues
            .get(&nonce)
            .ok_or(BridgeError::IssueNotFound(nonce))?;
        if issue.permit.vault != *caller {
            return Err(BridgeError::NotVaultOwner(nonce));
        }
        if !issue.status.can_transition_to(next) {
            return Err(BridgeError::WrongIssueStatus {
                nonce,
                status: issue.status,
            });
        }
        Ok(issue)
    }
}

/// Status writes after validation; an out-of-order move is a bug upstream
fn advance_issue(issue: &mut IssueRequest, next: IssueStatus) {
    debug_assert!(
        issue.status.can_transition_to(next),
        "issue {} cannot move from {} to {}",
        issue.nonce(),
        issue.status,
        next
    );
    if issue.status.can_transition_to(next) {
        issue.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::common::error::ErrorKind;
    use crate::crypto::{compute_value_commitment, Blinding};
    use crate::relay::RelayError;
    use crate::types::Hash32;

    #[test]
    fn test_request_lock_creates_permit() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();

        let permit = bridge.get_lock_permit(nonce).unwrap();
        assert_eq!(nonce, 1);
        assert_eq!(permit.expires_at, T0 + 3600);
        assert!(!permit.used);
        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::AwaitingMint);
        assert_eq!(bridge.get_issue_status(99), IssueStatus::None);

        let second = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        assert_eq!(second, 2);
    }

    #[test]
    fn test_request_lock_preconditions() {
        let mut bridge = bridge(true);
        assert!(matches!(
            bridge.request_lock(&requester(), &vault(), USER_KEY, WARRANTY - 1, T0),
            Err(BridgeError::WrongWarranty { .. })
        ));
        assert!(matches!(
            bridge.request_lock(&requester(), &AccountId([0x55; 32]), USER_KEY, WARRANTY, T0),
            Err(BridgeError::VaultUnavailable(_))
        ));

        bridge.vaults_mut().set_accepts_issue(&vault(), false).unwrap();
        assert!(matches!(
            bridge.request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0),
            Err(BridgeError::VaultUnavailable(_))
        ));
        assert!(bridge.issues().next().is_none());
    }

    #[test]
    fn test_full_issue_confirms_and_mints() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 10_000);

        bridge.mint(&requester(), nonce, transfer, T0 + 10).unwrap();
        assert!(bridge.get_lock_permit(nonce).unwrap().used);
        assert_eq!(
            bridge.get_issue_status(nonce),
            IssueStatus::AwaitingConfirmation
        );
        assert_eq!(bridge.token().total_supply(), 0);

        assert!(matches!(
            bridge.confirm_issue(&requester(), nonce, T0 + 20),
            Err(BridgeError::NotVaultOwner(_))
        ));
        bridge.confirm_issue(&vault(), nonce, T0 + 20).unwrap();

        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Confirmed);
        assert_eq!(bridge.token().balance_of(&requester()), 9_990);
        assert_eq!(bridge.token().balance_of(&vault()), 10);
        assert_eq!(bridge.payout_balance(&requester()), WARRANTY);

        let cv = bridge.get_issue(nonce).unwrap().mint.as_ref().unwrap().cv;
        assert_eq!(
            bridge.vaults().get_vault(&vault()).unwrap().running_commitment,
            cv
        );
    }

    #[test]
    fn test_permit_used_once() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);

        bridge
            .mint(&requester(), nonce, transfer.clone(), T0 + 10)
            .unwrap();
        assert_eq!(
            bridge
                .mint(&requester(), nonce, transfer, T0 + 20)
                .unwrap_err()
                .to_string(),
            format!("permit {} already used", nonce)
        );
    }

    #[test]
    fn test_late_mint_rejected() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);

        let err = bridge
            .mint(&requester(), nonce, transfer.clone(), T0 + 3601)
            .unwrap_err();
        assert!(err.to_string().contains("expired"));
        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::AwaitingMint);

        // the boundary itself is still valid
        bridge.mint(&requester(), nonce, transfer, T0 + 3600).unwrap();
    }

    #[test]
    fn test_mint_rejections_leave_no_trace() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let good = pay_vault(&mut bridge, nonce, 500);

        let mut bad_fee = good.clone();
        bad_fee.fee_blinding = Blinding::from_bytes([0x44; 32]);
        assert!(matches!(
            bridge.mint(&requester(), nonce, bad_fee, T0),
            Err(BridgeError::ConservationFailed { .. })
        ));

        let mut bad_note = good.clone();
        bad_note.note_commitment = Hash32([0x99; 32]);
        let err = bridge.mint(&requester(), nonce, bad_note, T0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CryptographicRejection);

        assert!(matches!(
            bridge.mint(&AccountId([0x66; 32]), nonce, good.clone(), T0),
            Err(BridgeError::NotRequester(_))
        ));

        let permit = bridge.get_lock_permit(nonce).unwrap();
        assert!(!permit.used);
        bridge.mint(&requester(), nonce, good, T0).unwrap();
    }

    #[test]
    fn test_mint_waits_for_confirmations() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault_with_depth(&mut bridge, nonce, 500, 3);

        let err = bridge
            .mint(&requester(), nonce, transfer, T0)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Relay(RelayError::NotConfirmed { .. })
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_mint_rejected_proof() {
        let mut bridge = bridge(false);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);

        assert!(matches!(
            bridge.mint(&requester(), nonce, transfer, T0),
            Err(BridgeError::InvalidProof(VerificationKeyId::Mint))
        ));
    }

    #[test]
    fn test_challenge_forfeits_requester_warranty() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0).unwrap();

        // opening of the recorded note: nothing to challenge
        let honest = RevealedSecret {
            value: 500,
            rcm: crate::crypto::derive_blinding_factor(nonce, &USER_KEY),
            proof: Default::default(),
        };
        assert!(matches!(
            bridge.challenge_issue(&vault(), nonce, honest, T0 + 1),
            Err(BridgeError::ChallengeUnfounded)
        ));

        let revealed = RevealedSecret {
            value: 1,
            rcm: Hash32([0x0f; 32]),
            proof: Default::default(),
        };
        bridge
            .challenge_issue(&vault(), nonce, revealed, T0 + 1)
            .unwrap();

        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Challenged);
        assert!(bridge.get_issue(nonce).unwrap().mint.is_none());
        assert_eq!(bridge.payout_balance(&vault()), WARRANTY);
        assert_eq!(bridge.token().total_supply(), 0);

        // resolved exactly once
        assert!(matches!(
            bridge.confirm_issue(&vault(), nonce, T0 + 20),
            Err(BridgeError::WrongIssueStatus { .. })
        ));
        assert!(bridge.expire_issue(nonce, T0 + 1_000_000).is_err());
    }

    #[test]
    fn test_confirmation_window_closes() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0).unwrap();

        let err = bridge
            .confirm_issue(&vault(), nonce, T0 + 86_401)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ConfirmationWindowClosed { closed_at, .. } if closed_at == T0 + 86_400
        ));
        assert_eq!(
            bridge.get_issue_status(nonce),
            IssueStatus::AwaitingConfirmation
        );
        assert_eq!(bridge.token().total_supply(), 0);

        // only expiry is left, and it pays the requester
        bridge.expire_issue(nonce, T0 + 86_401).unwrap();
        assert_eq!(bridge.payout_balance(&requester()), 2 * WARRANTY);
    }

    #[test]
    fn test_confirm_at_window_edge_is_accepted() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0).unwrap();

        bridge.confirm_issue(&vault(), nonce, T0 + 86_400).unwrap();
        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Confirmed);
    }

    #[test]
    fn test_challenge_window_closes() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0).unwrap();

        let revealed = RevealedSecret {
            value: 1,
            rcm: Hash32([0x0f; 32]),
            proof: Default::default(),
        };
        assert!(matches!(
            bridge.challenge_issue(&vault(), nonce, revealed, T0 + 86_401),
            Err(BridgeError::ConfirmationWindowClosed { .. })
        ));
    }

    #[test]
    fn test_expire_unminted_pays_vault() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();

        let err = bridge.expire_issue(nonce, T0 + 3600).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(bridge.expirable_issues(T0 + 3600), Vec::<u64>::new());
        assert_eq!(bridge.expirable_issues(T0 + 3601), vec![nonce]);

        bridge.expire_issue(nonce, T0 + 3601).unwrap();
        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Expired);
        assert_eq!(bridge.payout_balance(&vault()), WARRANTY);
        assert_eq!(bridge.withdraw_payout(&vault()).unwrap(), WARRANTY);
        assert!(matches!(
            bridge.withdraw_payout(&vault()),
            Err(BridgeError::NoPayout(_))
        ));
    }

    #[test]
    fn test_expire_unconfirmed_slashes_vault() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0 + 5).unwrap();
        let collateral = bridge.vaults().get_vault(&vault()).unwrap().collateral;

        bridge.expire_issue(nonce, T0 + 5 + 86_401).unwrap();

        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Expired);
        assert_eq!(bridge.payout_balance(&requester()), 2 * WARRANTY);
        assert_eq!(
            bridge.vaults().get_vault(&vault()).unwrap().collateral,
            collateral - WARRANTY
        );
        assert!(matches!(
            bridge.confirm_issue(&vault(), nonce, T0 + 20),
            Err(BridgeError::WrongIssueStatus { .. })
        ));
    }

    #[test]
    fn test_confirmed_issue_accepts_no_further_transition() {
        let mut bridge = bridge(true);
        let nonce = bridge
            .request_lock(&requester(), &vault(), USER_KEY, WARRANTY, T0)
            .unwrap();
        let transfer = pay_vault(&mut bridge, nonce, 500);
        bridge.mint(&requester(), nonce, transfer, T0).unwrap();
        bridge.confirm_issue(&vault(), nonce, T0 + 1).unwrap();

        let revealed = RevealedSecret {
            value: 1,
            rcm: Hash32([0x0f; 32]),
            proof: Default::default(),
        };
        for err in [
            bridge.expire_issue(nonce, T0 + 1_000_000).unwrap_err(),
            bridge.challenge_issue(&vault(), nonce, revealed, T0 + 2).unwrap_err(),
            bridge.confirm_issue(&vault(), nonce, T0 + 2).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                BridgeError::WrongIssueStatus {
                    status: IssueStatus::Confirmed,
                    ..
                }
            ));
        }
        assert_eq!(bridge.get_issue_status(nonce), IssueStatus::Confirmed);
    }

    #[test]
    fn test_value_commitment_fixture_conserves() {
        let cv = compute_value_commitment(500, &Blinding::from_bytes([1; 32]));
        assert_ne!(cv, compute_value_commitment(500, &Blinding::zero()));
    }
}
