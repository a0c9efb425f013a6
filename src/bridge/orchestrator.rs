//! Bridge Orchestrator
//!
//! Owns the relay, the vault registry and the wrapped token, and runs the
//! issue and redeem state machines on top of them (see `issue.rs` and
//! `redeem.rs`). Every transition validates completely before the first
//! mutation, so a rejected call changes nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

use super::token::WrappedToken;
use super::types::{BridgeConfig, BridgeError, BridgeStats, NonceCounters};
use crate::crypto::ProofVerifier;
use crate::relay::Relay;
use crate::types::{
    AccountId, BurnRequest, IssueRequest, IssueStatus, Journal, LockPermit, RedeemStatus,
    StateChange,
};
use crate::vault::VaultRegistry;

/// Persisted orchestrator records, used to rebuild a [`Bridge`]
#[derive(Debug, Clone, Default)]
pub struct BridgeRecords {
    pub issues: Vec<IssueRequest>,
    pub burns: Vec<BurnRequest>,
    pub payouts: HashMap<AccountId, u128>,
    pub counters: NonceCounters,
}

/// Issue/redeem orchestrator
pub struct Bridge {
    pub(super) config: BridgeConfig,
    pub(super) relay: Relay,
    pub(super) vaults: VaultRegistry,
    pub(super) verifier: Arc<dyn ProofVerifier>,
    pub(super) token: Box<dyn WrappedToken>,
    pub(super) issues: BTreeMap<u64, IssueRequest>,
    pub(super) burns: BTreeMap<u64, BurnRequest>,
    /// Warranty refunds, forfeits and slashed collateral owed per account
    pub(super) payouts: HashMap<AccountId, u128>,
    pub(super) counters: NonceCounters,
    pub(super) journal: Journal,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        relay: Relay,
        vaults: VaultRegistry,
        verifier: Arc<dyn ProofVerifier>,
        token: Box<dyn WrappedToken>,
    ) -> Self {
        Self::restore(config, relay, vaults, verifier, token, BridgeRecords::default())
    }

    pub fn restore(
        config: BridgeConfig,
        relay: Relay,
        vaults: VaultRegistry,
        verifier: Arc<dyn ProofVerifier>,
        token: Box<dyn WrappedToken>,
        records: BridgeRecords,
    ) -> Self {
        info!(
            target: "zbridge::system",
            issues = records.issues.len(),
            burns = records.burns.len(),
            next_issue = records.counters.next_issue,
            next_burn = records.counters.next_burn,
            "Bridge ready"
        );

        Self {
            config,
            relay,
            vaults,
            verifier,
            token,
            issues: records.issues.into_iter().map(|i| (i.nonce(), i)).collect(),
            burns: records.burns.into_iter().map(|b| (b.nonce, b)).collect(),
            payouts: records.payouts,
            counters: records.counters,
            journal: Journal::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Header submission and relayer management go straight to the relay
    pub fn relay_mut(&mut self) -> &mut Relay {
        &mut self.relay
    }

    pub fn vaults(&self) -> &VaultRegistry {
        &self.vaults
    }

    pub fn vaults_mut(&mut self) -> &mut VaultRegistry {
        &mut self.vaults
    }

    pub fn token(&self) -> &dyn WrappedToken {
        self.token.as_ref()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// `IssueStatus::None` for an unknown nonce
    pub fn get_issue_status(&self, nonce: u64) -> IssueStatus {
        self.issues
            .get(&nonce)
            .map(|i| i.status)
            .unwrap_or_default()
    }

    pub fn get_redeem_status(&self, nonce: u64) -> RedeemStatus {
        self.burns
            .get(&nonce)
            .map(|b| b.status)
            .unwrap_or_default()
    }

    pub fn get_lock_permit(&self, nonce: u64) -> Option<&LockPermit> {
        self.issues.get(&nonce).map(|i| &i.permit)
    }

    pub fn get_issue(&self, nonce: u64) -> Option<&IssueRequest> {
        self.issues.get(&nonce)
    }

    pub fn get_burn(&self, nonce: u64) -> Option<&BurnRequest> {
        self.burns.get(&nonce)
    }

    pub fn issues(&self) -> impl Iterator<Item = &IssueRequest> {
        self.issues.values()
    }

    pub fn burns(&self) -> impl Iterator<Item = &BurnRequest> {
        self.burns.values()
    }

    pub fn counters(&self) -> NonceCounters {
        self.counters
    }

    pub fn payout_balance(&self, account: &AccountId) -> u128 {
        self.payouts.get(account).copied().unwrap_or(0)
    }

    pub fn payouts(&self) -> &HashMap<AccountId, u128> {
        &self.payouts
    }

    pub fn stats(&self) -> BridgeStats {
        let mut stats = BridgeStats::default();
        for issue in self.issues.values() {
            stats.count_issue(issue.status);
        }
        for burn in self.burns.values() {
            stats.count_redeem(burn.status);
        }
        stats
    }

    /// Issues whose waiting state has timed out at `now`
    pub fn expirable_issues(&self, now: u64) -> Vec<u64> {
        self.issues
            .values()
            .filter(|i| self.issue_deadline(i).map(|d| now > d).unwrap_or(false))
            .map(|i| i.nonce())
            .collect()
    }

    /// Burns whose release deadline has passed at `now`
    pub fn claimable_burns(&self, now: u64) -> Vec<u64> {
        self.burns
            .values()
            .filter(|b| b.status == RedeemStatus::AwaitingRelease && b.is_overdue(now))
            .map(|b| b.nonce)
            .collect()
    }

    /// Deadline of the issue's current waiting state, if it is waiting
    pub(super) fn issue_deadline(&self, issue: &IssueRequest) -> Option<u64> {
        match (issue.status, &issue.mint) {
            (IssueStatus::AwaitingMint, _) => Some(issue.permit.expires_at),
            (IssueStatus::AwaitingConfirmation, Some(mint)) => Some(
                mint.submitted_at
                    .saturating_add(self.config.confirmation_window_secs),
            ),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Payouts
    // ------------------------------------------------------------------------

    /// Take everything owed to the caller
    pub fn withdraw_payout(&mut self, caller: &AccountId) -> Result<u128, BridgeError> {
        let amount = self
            .payouts
            .remove(caller)
            .filter(|amount| *amount > 0)
            .ok_or(BridgeError::NoPayout(*caller))?;

        self.journal.record(StateChange::Payout(*caller));
        info!(target: "zbridge::system", account = %caller, amount = amount, "Payout withdrawn");
        Ok(amount)
    }

    pub(super) fn credit(&mut self, account: &AccountId, amount: u128) {
        if amount == 0 {
            return;
        }
        let entry = self.payouts.entry(*account).or_insert(0);
        *entry = entry.saturating_add(amount);
        self.journal.record(StateChange::Payout(*account));
    }

    // ------------------------------------------------------------------------
    // Journal
    // ------------------------------------------------------------------------

    /// Every record touched since the last drain, across all components
    pub fn drain_changes(&mut self) -> Vec<StateChange> {
        let mut changes = self.relay.drain_changes();
        changes.extend(self.vaults.drain_changes());
        for change in self.journal.drain() {
            if !changes.contains(&change) {
                changes.push(change);
            }
        }
        changes
    }

    /// Put back changes that were drained but could not be persisted, so
    /// the next drain returns them again
    pub fn requeue_changes(&mut self, changes: Vec<StateChange>) {
        for change in changes {
            self.journal.record(change);
        }
    }
}
