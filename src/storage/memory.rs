//! In-Memory State Store
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the process exits.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{Record, Snapshot, StateStore, StorageResult};
use crate::bridge::NonceCounters;
use crate::relay::{BlockHeader, ChainTip};
use crate::types::{AccountId, BlockHash, BurnRequest, IssueRequest, Vault, VaultId};

#[derive(Default)]
struct Tables {
    headers: BTreeMap<BlockHash, BlockHeader>,
    tip: Option<(ChainTip, BlockHash)>,
    relayers: BTreeSet<AccountId>,
    vaults: BTreeMap<VaultId, Vault>,
    exchange_rate: Option<u128>,
    issues: BTreeMap<u64, IssueRequest>,
    burns: BTreeMap<u64, BurnRequest>,
    payouts: HashMap<AccountId, u128>,
    counters: Option<NonceCounters>,
}

impl Tables {
    fn apply(&mut self, record: &Record) {
        match record {
            Record::Header(header) => {
                self.headers.insert(header.hash, header.clone());
            }
            Record::ChainTip { tip, checkpoint } => {
                self.tip = Some((tip.clone(), *checkpoint));
            }
            Record::Relayers(relayers) => self.relayers = relayers.clone(),
            Record::Vault(vault) => {
                self.vaults.insert(vault.id, vault.clone());
            }
            Record::ExchangeRate(rate) => self.exchange_rate = Some(*rate),
            Record::Issue(issue) => {
                self.issues.insert(issue.nonce(), issue.clone());
            }
            Record::Burn(burn) => {
                self.burns.insert(burn.nonce, burn.clone());
            }
            Record::Payout(account, 0) => {
                self.payouts.remove(account);
            }
            Record::Payout(account, amount) => {
                self.payouts.insert(*account, *amount);
            }
            Record::Counters(counters) => self.counters = Some(*counters),
        }
    }
}

/// In-memory state store
///
/// One lock over all tables, so a batch is applied atomically.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored headers
    pub async fn header_count(&self) -> usize {
        self.tables.read().await.headers.len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn write_batch(&self, records: &[Record]) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        for record in records {
            tables.apply(record);
        }
        Ok(())
    }

    async fn load(&self) -> StorageResult<Snapshot> {
        let tables = self.tables.read().await;
        let (tip, checkpoint) = match &tables.tip {
            Some((tip, checkpoint)) => (Some(tip.clone()), Some(*checkpoint)),
            None => (None, None),
        };

        Ok(Snapshot {
            headers: tables.headers.values().cloned().collect(),
            tip,
            checkpoint,
            relayers: tables.relayers.clone(),
            vaults: tables.vaults.values().cloned().collect(),
            exchange_rate: tables.exchange_rate,
            issues: tables.issues.values().cloned().collect(),
            burns: tables.burns.values().cloned().collect(),
            payouts: tables.payouts.clone(),
            counters: tables.counters,
        })
    }

    async fn get_header(&self, hash: &BlockHash) -> StorageResult<Option<BlockHeader>> {
        Ok(self.tables.read().await.headers.get(hash).cloned())
    }

    async fn get_vault(&self, id: &VaultId) -> StorageResult<Option<Vault>> {
        Ok(self.tables.read().await.vaults.get(id).cloned())
    }

    async fn get_issue(&self, nonce: u64) -> StorageResult<Option<IssueRequest>> {
        Ok(self.tables.read().await.issues.get(&nonce).cloned())
    }

    async fn get_burn(&self, nonce: u64) -> StorageResult<Option<BurnRequest>> {
        Ok(self.tables.read().await.burns.get(&nonce).cloned())
    }
}
