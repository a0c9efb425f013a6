//! Bridge Types
//!
//! Configuration, errors and statistics for the issue/redeem orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::token::TokenError;
use crate::common::error::ErrorKind;
use crate::crypto::VerificationKeyId;
use crate::relay::RelayError;
use crate::types::{AccountId, IssueStatus, RedeemStatus, VaultId};
use crate::vault::VaultError;

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Lifetime of a lock permit
    pub permit_ttl_secs: u64,
    /// Time a vault has to confirm or challenge a mint
    pub confirmation_window_secs: u64,
    /// Time a vault has to release a redeem on the backing chain
    pub release_window_secs: u64,
    /// Deposit a requester posts with each lock request
    pub requester_warranty: u128,
    /// Collateral a vault forfeits by not answering a mint
    pub vault_warranty: u128,
    /// Issue and redeem fee in basis points
    pub fee_bps: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            permit_ttl_secs: 3600,
            confirmation_window_secs: 86_400,
            release_window_secs: 86_400,
            requester_warranty: 1_000,
            vault_warranty: 1_000,
            fee_bps: 10,
        }
    }
}

impl BridgeConfig {
    /// `amount * fee_bps / 10000`, floored
    pub fn fee_for(&self, amount: u64) -> u64 {
        let fee = u128::from(amount) * u128::from(self.fee_bps) / 10_000;
        // fee_bps < 10000 keeps the fee below the amount
        u64::try_from(fee).unwrap_or(amount)
    }
}

/// Next nonces to hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceCounters {
    pub next_issue: u64,
    pub next_burn: u64,
}

impl Default for NonceCounters {
    fn default() -> Self {
        Self {
            next_issue: 1,
            next_burn: 1,
        }
    }
}

/// Bridge errors
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("vault {0} is not available")]
    VaultUnavailable(VaultId),

    #[error("warranty must be {expected}, got {got}")]
    WrongWarranty { expected: u128, got: u128 },

    #[error("vault collateral {collateral} does not cover warranty {required}")]
    InsufficientVaultCollateral { collateral: u128, required: u128 },

    #[error("no issue request with nonce {0}")]
    IssueNotFound(u64),

    #[error("no burn request with nonce {0}")]
    BurnNotFound(u64),

    #[error("caller is not the requester of issue {0}")]
    NotRequester(u64),

    #[error("caller is not the vault of request {0}")]
    NotVaultOwner(u64),

    #[error("caller is not the redeemer of burn {0}")]
    NotRedeemer(u64),

    #[error("permit {0} already used")]
    PermitUsed(u64),

    #[error("permit {nonce} expired at {expires_at}")]
    PermitExpired { nonce: u64, expires_at: u64 },

    #[error("vault address changed since permit {0} was issued")]
    VaultAddressChanged(u64),

    #[error("issue {nonce} is {status}")]
    WrongIssueStatus { nonce: u64, status: IssueStatus },

    #[error("burn {nonce} is {status}")]
    WrongRedeemStatus { nonce: u64, status: RedeemStatus },

    #[error("value commitment does not open to the stated amount")]
    ValueCommitmentMismatch,

    #[error("value commitments do not conserve value net of fee {fee}")]
    ConservationFailed { fee: u64 },

    #[error("note commitment not included in block")]
    InclusionFailed,

    #[error("note commitment does not pay the vault under this permit")]
    NoteCommitmentMismatch,

    #[error("released note differs from the requested one")]
    ReleasedNoteMismatch,

    #[error("revealed note matches the recorded commitment")]
    ChallengeUnfounded,

    #[error("{0} proof rejected")]
    InvalidProof(VerificationKeyId),

    #[error("confirmation window for issue {nonce} closed at {closed_at}")]
    ConfirmationWindowClosed { nonce: u64, closed_at: u64 },

    #[error("request {nonce} cannot time out before {deadline}")]
    DeadlineNotReached { nonce: u64, deadline: u64 },

    #[error("nothing to withdraw for {0}")]
    NoPayout(AccountId),

    #[error("arithmetic overflow")]
    Overflow,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Relay(e) => e.kind(),
            BridgeError::Vault(e) => e.kind(),
            BridgeError::Token(_)
            | BridgeError::WrongWarranty { .. }
            | BridgeError::InsufficientVaultCollateral { .. }
            | BridgeError::Overflow => ErrorKind::EconomicFailure,
            BridgeError::ZeroAmount => ErrorKind::MalformedInput,
            BridgeError::NotRequester(_)
            | BridgeError::NotVaultOwner(_)
            | BridgeError::NotRedeemer(_) => ErrorKind::Unauthorized,
            BridgeError::ValueCommitmentMismatch
            | BridgeError::ConservationFailed { .. }
            | BridgeError::InclusionFailed
            | BridgeError::NoteCommitmentMismatch
            | BridgeError::ReleasedNoteMismatch
            | BridgeError::ChallengeUnfounded
            | BridgeError::InvalidProof(_) => ErrorKind::CryptographicRejection,
            BridgeError::VaultUnavailable(_)
            | BridgeError::IssueNotFound(_)
            | BridgeError::BurnNotFound(_)
            | BridgeError::PermitUsed(_)
            | BridgeError::PermitExpired { .. }
            | BridgeError::VaultAddressChanged(_)
            | BridgeError::WrongIssueStatus { .. }
            | BridgeError::WrongRedeemStatus { .. }
            | BridgeError::ConfirmationWindowClosed { .. }
            | BridgeError::DeadlineNotReached { .. }
            | BridgeError::NoPayout(_) => ErrorKind::PreconditionViolation,
        }
    }

    /// Retryable errors clear up on their own as blocks and time pass
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Relay(e) => e.is_retryable(),
            BridgeError::Vault(e) => e.is_retryable(),
            BridgeError::DeadlineNotReached { .. } => true,
            _ => false,
        }
    }
}

/// Request counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    pub issues_awaiting_mint: u64,
    pub issues_awaiting_confirmation: u64,
    pub issues_confirmed: u64,
    pub issues_challenged: u64,
    pub issues_expired: u64,
    pub redeems_awaiting_release: u64,
    pub redeems_confirmed: u64,
    pub redeems_challenged: u64,
    pub redeems_claimed: u64,
}

impl BridgeStats {
    pub(crate) fn count_issue(&mut self, status: IssueStatus) {
        match status {
            IssueStatus::None => {}
            IssueStatus::AwaitingMint => self.issues_awaiting_mint += 1,
            IssueStatus::AwaitingConfirmation => self.issues_awaiting_confirmation += 1,
            IssueStatus::Confirmed => self.issues_confirmed += 1,
            IssueStatus::Challenged => self.issues_challenged += 1,
            IssueStatus::Expired => self.issues_expired += 1,
        }
    }

    pub(crate) fn count_redeem(&mut self, status: RedeemStatus) {
        match status {
            RedeemStatus::None => {}
            RedeemStatus::AwaitingRelease => self.redeems_awaiting_release += 1,
            RedeemStatus::Confirmed => self.redeems_confirmed += 1,
            RedeemStatus::Challenged => self.redeems_challenged += 1,
            RedeemStatus::Claimed => self.redeems_claimed += 1,
        }
    }

    /// Requests still waiting on someone
    pub fn open(&self) -> u64 {
        self.issues_awaiting_mint + self.issues_awaiting_confirmation + self.redeems_awaiting_release
    }
}

impl std::fmt::Display for BridgeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "issues(mint={}, confirm={}, ok={}, challenged={}, expired={}) \
             redeems(release={}, ok={}, challenged={}, claimed={})",
            self.issues_awaiting_mint,
            self.issues_awaiting_confirmation,
            self.issues_confirmed,
            self.issues_challenged,
            self.issues_expired,
            self.redeems_awaiting_release,
            self.redeems_confirmed,
            self.redeems_challenged,
            self.redeems_claimed,
        )
    }
}
