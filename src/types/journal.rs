//! State Change Journal
//!
//! Core components note every record they touch. The service layer drains
//! the journal after each transition and persists exactly those records.

use serde::{Deserialize, Serialize};

use super::primitives::{AccountId, BlockHash, VaultId};

/// One touched record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateChange {
    Header(BlockHash),
    ChainTip,
    Relayers,
    Vault(VaultId),
    ExchangeRate,
    Issue(u64),
    Burn(u64),
    Payout(AccountId),
    Counters,
}

/// Append-only list of changes since the last drain
#[derive(Debug, Clone, Default)]
pub struct Journal {
    changes: Vec<StateChange>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: StateChange) {
        if !self.changes.contains(&change) {
            self.changes.push(change);
        }
    }

    /// Take every change recorded so far
    pub fn drain(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dedups_and_drain_empties() {
        let mut journal = Journal::new();
        journal.record(StateChange::Issue(1));
        journal.record(StateChange::Issue(1));
        journal.record(StateChange::Counters);
        assert_eq!(journal.len(), 2);

        let drained = journal.drain();
        assert_eq!(drained, vec![StateChange::Issue(1), StateChange::Counters]);
        assert!(journal.is_empty());
    }
}
