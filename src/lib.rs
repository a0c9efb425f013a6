//! zBridge - Shielded Chain Bridge
//!
//! Moves value between a shielded, Zcash-like backing chain and a
//! smart-contract issuing chain through collateralized vaults instead of a
//! custodian.
//!
//! ## Components
//!
//! 1. **Relay** - Light client for backing-chain headers: chain work, tip
//!    selection, reorgs, confirmation and inclusion queries
//! 2. **Vault Registry** - Collateral, hidden obligations, exchange rate,
//!    liquidation
//! 3. **Bridge** - Issue and redeem state machines with permits, challenges
//!    and timeouts
//! 4. **Service** - Shared async access, persistence and the timeout watcher
//!
//! ## Out of Process
//!
//! Proving, Equihash verification and the wrapped token contract are
//! injected through [`ProofVerifier`], [`PowOracle`] and [`WrappedToken`].

pub mod bridge;
pub mod common;
pub mod crypto;
pub mod relay;
pub mod service;
pub mod storage;
pub mod types;
pub mod vault;

// Re-exports: common infrastructure
pub use common::{BridgeSettings, ErrorKind, Network, Result, ZBridgeError};

// Re-exports: crypto
pub use crypto::{
    Blinding, Groth16Proof, MerkleProof, ProofVerifier, ShieldedAddress, ValueCommitment,
    VerificationKeyId, VerifierError,
};

// Re-exports: relay
pub use relay::{
    AcceptAllPowOracle, BlockHeader, ChainTip, Checkpoint, PowError, PowOracle, Relay,
    RelayConfig, RelayError, Reorg, SubmitOutcome, TargetPowOracle,
};

// Re-exports: vaults
pub use vault::{VaultConfig, VaultError, VaultRegistry};

// Re-exports: bridge
pub use bridge::{
    Bridge, BridgeConfig, BridgeError, BridgeRecords, BridgeStats, InMemoryToken,
    NonceCounters, TokenError, WrappedToken,
};

// Re-exports: storage
pub use storage::{MemoryStateStore, SqliteStateStore, StateStore, StorageError};

// Re-exports: service
pub use service::{BridgeService, Capabilities, Genesis, ServiceConfig, TickResult};

// Re-exports: types
pub use types::{
    AccountId, BlockHash, BurnRequest, BurnTransfer, Hash32, IssueRequest, IssueStatus,
    LockPermit, MintRecord, MintTransfer, RedeemStatus, RevealedSecret, Vault, VaultId,
};
