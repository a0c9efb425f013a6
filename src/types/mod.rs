//! Shared Types Module
//!
//! Data types shared across the bridge components.

pub mod issue;
pub mod journal;
pub mod primitives;
pub mod redeem;
pub mod vault;

// Re-exports for convenience
pub use issue::{IssueRequest, IssueStatus, LockPermit, MintRecord, MintTransfer, RevealedSecret};
pub use journal::{Journal, StateChange};
pub use primitives::{unix_now, AccountId, BlockHash, Hash32, VaultId};
pub use redeem::{BurnRequest, BurnTransfer, RedeemStatus};
pub use vault::{BalanceProof, Vault};
