//! Storage Trait Definitions
//!
//! Every record the core components journal has a [`Record`] form. The
//! service writes each transition's records as one batch and rebuilds the
//! components from a [`Snapshot`] on startup.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::bridge::NonceCounters;
use crate::relay::{BlockHeader, ChainTip};
use crate::types::{AccountId, BlockHash, BurnRequest, IssueRequest, Vault, VaultId};

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl StorageError {
    /// Connection failures (pool exhausted, database busy) may clear up
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::InvalidData(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One persisted record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(BlockHeader),
    ChainTip { tip: ChainTip, checkpoint: BlockHash },
    Relayers(BTreeSet<AccountId>),
    Vault(Vault),
    ExchangeRate(u128),
    Issue(IssueRequest),
    Burn(BurnRequest),
    /// A zero amount removes the entry
    Payout(AccountId, u128),
    Counters(NonceCounters),
}

/// Everything needed to rebuild the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub headers: Vec<BlockHeader>,
    pub tip: Option<ChainTip>,
    pub checkpoint: Option<BlockHash>,
    pub relayers: BTreeSet<AccountId>,
    pub vaults: Vec<Vault>,
    pub exchange_rate: Option<u128>,
    pub issues: Vec<IssueRequest>,
    pub burns: Vec<BurnRequest>,
    pub payouts: HashMap<AccountId, u128>,
    pub counters: Option<NonceCounters>,
}

impl Snapshot {
    /// Nothing has been persisted yet
    pub fn is_empty(&self) -> bool {
        self.tip.is_none() && self.headers.is_empty()
    }
}

/// Bridge state storage interface
///
/// Implementations:
/// - `SqliteStateStore` - Production storage with SQLite
/// - `MemoryStateStore` - In-memory storage for testing
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Write all records at once; a failed batch writes nothing
    async fn write_batch(&self, records: &[Record]) -> StorageResult<()>;

    /// Load the full persisted state. Vectors come back in key order.
    async fn load(&self) -> StorageResult<Snapshot>;

    async fn get_header(&self, hash: &BlockHash) -> StorageResult<Option<BlockHeader>>;

    async fn get_vault(&self, id: &VaultId) -> StorageResult<Option<Vault>>;

    async fn get_issue(&self, nonce: u64) -> StorageResult<Option<IssueRequest>>;

    async fn get_burn(&self, nonce: u64) -> StorageResult<Option<BurnRequest>>;
}
