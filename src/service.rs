//! Bridge Service
//!
//! Shares one [`Bridge`] between async callers, persists every record a
//! transition touches, and runs the timeout watcher.
//!
//! All writes go through [`BridgeService::execute`], which holds the write
//! lock across the transition and its persistence, so the store always sees
//! transitions in the order they happened.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::bridge::{Bridge, BridgeRecords, WrappedToken};
use crate::common::config::BridgeSettings;
use crate::common::error::{ErrorKind, Result, ZBridgeError};
use crate::crypto::ProofVerifier;
use crate::relay::{Checkpoint, PowOracle, Relay};
use crate::storage::{Record, Snapshot, StateStore, StorageError};
use crate::types::{unix_now, AccountId, StateChange};
use crate::vault::VaultRegistry;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Seconds between watcher ticks
    pub watcher_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            watcher_interval_secs: 30,
        }
    }
}

/// External capabilities the bridge is built with
pub struct Capabilities {
    pub pow: Arc<dyn PowOracle>,
    pub verifier: Arc<dyn ProofVerifier>,
    pub token: Box<dyn WrappedToken>,
}

/// Starting state for a bridge with nothing persisted yet
#[derive(Debug, Clone)]
pub struct Genesis {
    pub checkpoint: Checkpoint,
    /// Manages the relayer set
    pub admin: AccountId,
    /// Publishes exchange rates
    pub oracle: AccountId,
    pub exchange_rate: u128,
}

/// Bridge with persistence and a timeout watcher
pub struct BridgeService {
    config: ServiceConfig,
    bridge: Arc<RwLock<Bridge>>,
    store: Arc<dyn StateStore>,
    running: Arc<RwLock<bool>>,
}

impl BridgeService {
    /// Wrap an already built bridge, persisting whatever it has journaled
    pub async fn new(
        config: ServiceConfig,
        mut bridge: Bridge,
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let changes = bridge.drain_changes();
        let records = records_for(&bridge, &changes);
        store.write_batch(&records).await?;

        Ok(Self {
            config,
            bridge: Arc::new(RwLock::new(bridge)),
            store,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Restore from `store`, or start from `genesis` when the store is empty
    pub async fn open(
        settings: &BridgeSettings,
        store: Arc<dyn StateStore>,
        capabilities: Capabilities,
        genesis: Genesis,
    ) -> Result<Self> {
        let snapshot = store.load().await?;
        let bridge = if snapshot.is_empty() {
            info!(
                target: "zbridge::system",
                height = genesis.checkpoint.height,
                "Empty store, starting from checkpoint"
            );
            let relay = Relay::new(
                settings.relay_config(),
                genesis.admin,
                capabilities.pow,
                genesis.checkpoint,
            )?;
            let vaults = VaultRegistry::new(
                settings.vault_config(),
                genesis.oracle,
                genesis.exchange_rate,
                capabilities.verifier.clone(),
            );
            Bridge::new(
                settings.bridge_config(),
                relay,
                vaults,
                capabilities.verifier,
                capabilities.token,
            )
        } else {
            rebuild(settings, snapshot, capabilities, &genesis)?
        };

        Self::new(settings.service_config(), bridge, store).await
    }

    /// Run one transition under the write lock and persist what it touched.
    ///
    /// Rejected transitions change nothing, so nothing is written for them.
    /// A storage error means the transition is applied in memory but not yet
    /// stored: its changes stay queued and go out with the next successful
    /// write (or [`BridgeService::flush`]).
    pub async fn execute<T, E, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Bridge) -> std::result::Result<T, E>,
        E: Into<ZBridgeError>,
    {
        let mut bridge = self.bridge.write().await;
        let outcome = op(&mut *bridge).map_err(Into::into);
        persist(&mut bridge, self.store.as_ref()).await?;
        outcome
    }

    /// Write out changes left queued by an earlier storage failure
    pub async fn flush(&self) -> Result<()> {
        let mut bridge = self.bridge.write().await;
        persist(&mut bridge, self.store.as_ref()).await
    }

    /// Read the bridge under the read lock
    pub async fn query<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Bridge) -> T,
    {
        let bridge = self.bridge.read().await;
        f(&*bridge)
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Retry queued writes, expire timed-out issues, liquidate
    /// under-collateralized vaults, and count burns whose redeemers may now
    /// claim collateral.
    pub async fn tick(&self, now: u64) -> Result<TickResult> {
        self.flush().await?;
        let mut result = TickResult::default();

        let expirable = self.query(|b| b.expirable_issues(now)).await;
        for nonce in expirable {
            match self.execute(|b| b.expire_issue(nonce, now)).await {
                Ok(()) => result.issues_expired += 1,
                Err(e) if e.kind() == ErrorKind::Storage => return Err(e),
                Err(e) => warn!(target: "zbridge::system", nonce, error = %e, "Expiry skipped"),
            }
        }

        let vault_ids: Vec<AccountId> = self
            .query(|b| b.vaults().vaults().filter(|v| v.active).map(|v| v.id).collect())
            .await;
        for id in vault_ids {
            if self
                .execute(|b| b.vaults_mut().check_liquidation(&id))
                .await?
            {
                result.vaults_liquidated += 1;
            }
        }

        result.burns_claimable = self.query(|b| b.claimable_burns(now).len()).await;
        Ok(result)
    }

    /// Run the watcher until [`BridgeService::stop`] is called
    pub async fn run(&self) -> Result<()> {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        info!(
            target: "zbridge::system",
            interval_secs = self.config.watcher_interval_secs,
            "Watcher started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.watcher_interval_secs.max(1)));
        loop {
            interval.tick().await;

            {
                let running = self.running.read().await;
                if !*running {
                    break;
                }
            }

            match self.tick(unix_now()).await {
                Ok(result) if result.has_activity() => {
                    info!(target: "zbridge::system", "Tick: {}", result);
                }
                Ok(_) => {}
                Err(e) => {
                    error!(target: "zbridge::system", error = %e, "Tick failed");
                }
            }
        }

        info!(target: "zbridge::system", "Watcher stopped");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

/// Result of one watcher tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickResult {
    pub issues_expired: usize,
    pub vaults_liquidated: usize,
    pub burns_claimable: usize,
}

impl TickResult {
    pub fn has_activity(&self) -> bool {
        self.issues_expired > 0 || self.vaults_liquidated > 0 || self.burns_claimable > 0
    }
}

impl std::fmt::Display for TickResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "expired: {}, liquidated: {}, claimable: {}",
            self.issues_expired, self.vaults_liquidated, self.burns_claimable
        )
    }
}

/// Drain the bridge journal into the store, requeueing it on failure
async fn persist(bridge: &mut Bridge, store: &dyn StateStore) -> Result<()> {
    let changes = bridge.drain_changes();
    if changes.is_empty() {
        return Ok(());
    }

    let records = records_for(bridge, &changes);
    if let Err(e) = store.write_batch(&records).await {
        error!(
            target: "zbridge::system",
            error = %e,
            records = records.len(),
            "Failed to persist transition, changes requeued"
        );
        bridge.requeue_changes(changes);
        return Err(e.into());
    }
    debug!(target: "zbridge::system", records = records.len(), "Transition persisted");
    Ok(())
}

/// Current form of every journaled record
fn records_for(bridge: &Bridge, changes: &[StateChange]) -> Vec<Record> {
    let relay = bridge.relay();
    let vaults = bridge.vaults();

    changes
        .iter()
        .filter_map(|change| match change {
            StateChange::Header(hash) => relay.get_header(hash).cloned().map(Record::Header),
            StateChange::ChainTip => Some(Record::ChainTip {
                tip: relay.get_chain_tip().clone(),
                checkpoint: relay.checkpoint(),
            }),
            StateChange::Relayers => Some(Record::Relayers(relay.relayers().clone())),
            StateChange::Vault(id) => vaults.get_vault(id).cloned().map(Record::Vault),
            StateChange::ExchangeRate => Some(Record::ExchangeRate(vaults.exchange_rate())),
            StateChange::Issue(nonce) => bridge.get_issue(*nonce).cloned().map(Record::Issue),
            StateChange::Burn(nonce) => bridge.get_burn(*nonce).cloned().map(Record::Burn),
            StateChange::Payout(account) => {
                Some(Record::Payout(*account, bridge.payout_balance(account)))
            }
            StateChange::Counters => Some(Record::Counters(bridge.counters())),
        })
        .collect()
}

/// Rebuild the bridge from a non-empty snapshot
fn rebuild(
    settings: &BridgeSettings,
    snapshot: Snapshot,
    capabilities: Capabilities,
    genesis: &Genesis,
) -> Result<Bridge> {
    let tip = snapshot
        .tip
        .ok_or_else(|| StorageError::InvalidData("headers stored without a chain tip".into()))?;
    let checkpoint = snapshot
        .checkpoint
        .ok_or_else(|| StorageError::InvalidData("chain tip stored without a checkpoint".into()))?;

    let relay = Relay::restore(
        settings.relay_config(),
        genesis.admin,
        capabilities.pow,
        checkpoint,
        snapshot.headers,
        tip,
        snapshot.relayers,
    )?;
    let vaults = VaultRegistry::restore(
        settings.vault_config(),
        genesis.oracle,
        snapshot.exchange_rate.unwrap_or(genesis.exchange_rate),
        capabilities.verifier.clone(),
        snapshot.vaults,
    );
    let records = BridgeRecords {
        issues: snapshot.issues,
        burns: snapshot.burns,
        payouts: snapshot.payouts,
        counters: snapshot.counters.unwrap_or_default(),
    };

    info!(
        target: "zbridge::system",
        headers = relay.header_count(),
        height = relay.get_chain_tip().height,
        "Bridge restored from store"
    );

    Ok(Bridge::restore(
        settings.bridge_config(),
        relay,
        vaults,
        capabilities.verifier,
        capabilities.token,
        records,
    ))
}
