//! Backing-Chain Light Client
//!
//! Stores verified headers, tracks cumulative work and resolves the
//! canonical tip. Everything the bridge knows about the backing chain comes
//! through the confirmation and inclusion queries here.
//!
//! Headers can only be appended. Competing branches are kept; the tip moves
//! to whichever header has strictly more cumulative work, and the canonical
//! height index is rewritten along the winning branch.

use num_bigint::BigUint;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::header::{BlockHeader, ChainTip, HeaderError, ParsedHeader};
use super::pow::{PowError, PowOracle};
use super::work::{work_from_bits, WorkError};
use crate::common::config::Network;
use crate::common::error::ErrorKind;
use crate::common::logging::log_header_event;
use crate::crypto::hash::{hash256_personalized, Personalization};
use crate::crypto::merkle::{self, MerkleError, MerkleProof, TREE_DEPTH};
use crate::types::{AccountId, BlockHash, Hash32, Journal, StateChange};

/// Confirmations required before a block can back an issue or redeem
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 6;

// ============================================================================
// Configuration
// ============================================================================

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Backing network; selects the block hash personalization
    pub network: Network,
    /// Blocks on top of a header before it counts as confirmed
    pub min_confirmations: u64,
    /// Depth of the note commitment tree
    pub merkle_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            min_confirmations: DEFAULT_MIN_CONFIRMATIONS,
            merkle_depth: TREE_DEPTH,
        }
    }
}

impl RelayConfig {
    pub fn personalization(&self) -> &'static Personalization {
        self.network.header_personalization()
    }
}

/// Trusted starting point of the relay
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Serialized header (its PoW is not checked)
    pub raw_header: Vec<u8>,
    pub height: u64,
    /// Chain work up to this header; defaults to the header's own work
    pub chain_work: Option<BigUint>,
}

// ============================================================================
// Errors
// ============================================================================

/// Relay errors
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("malformed header: {0}")]
    Header(#[from] HeaderError),

    #[error("invalid difficulty bits: {0}")]
    InvalidBits(#[from] WorkError),

    #[error("malformed merkle proof: {0}")]
    MerkleProof(#[from] MerkleError),

    #[error("unknown parent {0}")]
    UnknownParent(BlockHash),

    #[error("parent {0} is not verified")]
    ParentNotVerified(BlockHash),

    #[error("wrong height: expected {expected}, claimed {claimed}")]
    WrongHeight { expected: u64, claimed: u64 },

    #[error("header {0} already stored")]
    DuplicateHeader(BlockHash),

    #[error("proof of work rejected for {0}")]
    PowRejected(BlockHash),

    #[error("proof of work oracle failed: {0}")]
    PowUnavailable(#[from] PowError),

    #[error("caller {0} is not a relayer")]
    NotRelayer(AccountId),

    #[error("caller {0} is not the relay admin")]
    NotAdmin(AccountId),

    #[error("unknown header {0}")]
    UnknownHeader(BlockHash),

    #[error("block {hash} has {confirmations} confirmations, need {required}")]
    NotConfirmed {
        hash: BlockHash,
        confirmations: u64,
        required: u64,
    },

    #[error("batch aborted at header {index} after {accepted} accepted: {source}")]
    Batch {
        index: usize,
        accepted: usize,
        #[source]
        source: Box<RelayError>,
    },
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Header(_)
            | RelayError::InvalidBits(_)
            | RelayError::MerkleProof(_)
            | RelayError::WrongHeight { .. } => ErrorKind::MalformedInput,
            RelayError::UnknownParent(_)
            | RelayError::ParentNotVerified(_)
            | RelayError::DuplicateHeader(_)
            | RelayError::UnknownHeader(_)
            | RelayError::NotConfirmed { .. } => ErrorKind::PreconditionViolation,
            RelayError::PowRejected(_) | RelayError::PowUnavailable(_) => {
                ErrorKind::CryptographicRejection
            }
            RelayError::NotRelayer(_) | RelayError::NotAdmin(_) => ErrorKind::Unauthorized,
            RelayError::Batch { source, .. } => source.kind(),
        }
    }

    /// Whether the same call may succeed later without changing its input
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::UnknownParent(_)
            | RelayError::NotConfirmed { .. }
            | RelayError::PowUnavailable(PowError::Unavailable(_)) => true,
            RelayError::Batch { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Chain reorganization caused by a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorg {
    pub old_tip: BlockHash,
    pub new_tip: BlockHash,
    /// Last block shared by both branches
    pub fork_point: BlockHash,
    pub fork_height: u64,
    /// Blocks of the old branch that left the canonical chain
    pub depth: u64,
}

/// Result of an accepted header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub hash: BlockHash,
    pub height: u64,
    pub tip_advanced: bool,
    pub reorg: Option<Reorg>,
}

// ============================================================================
// Relay
// ============================================================================

/// Header relay for one backing chain
pub struct Relay {
    config: RelayConfig,
    admin: AccountId,
    relayers: BTreeSet<AccountId>,
    pow: Arc<dyn PowOracle>,
    headers: HashMap<BlockHash, BlockHeader>,
    /// Canonical chain: height -> hash, from the checkpoint to the tip
    canonical: BTreeMap<u64, BlockHash>,
    tip: ChainTip,
    checkpoint: BlockHash,
    journal: Journal,
}

impl Relay {
    /// Start a relay from a trusted checkpoint header
    pub fn new(
        config: RelayConfig,
        admin: AccountId,
        pow: Arc<dyn PowOracle>,
        checkpoint: Checkpoint,
    ) -> Result<Self, RelayError> {
        let parsed = ParsedHeader::parse(&checkpoint.raw_header)?;
        let hash = hash256_personalized(&checkpoint.raw_header, config.personalization());
        let work = match checkpoint.chain_work {
            Some(work) => work,
            None => work_from_bits(parsed.bits)?,
        };

        let header = BlockHeader::from_parsed(hash, &parsed, checkpoint.height, work);
        let tip = ChainTip::of(&header);

        let mut journal = Journal::new();
        journal.record(StateChange::Header(hash));
        journal.record(StateChange::ChainTip);
        journal.record(StateChange::Relayers);

        info!(
            target: "zbridge::relay",
            hash = %hash,
            height = checkpoint.height,
            network = %config.network,
            oracle = pow.oracle_type(),
            "Relay initialized from checkpoint"
        );

        let mut headers = HashMap::new();
        headers.insert(hash, header);
        let mut canonical = BTreeMap::new();
        canonical.insert(checkpoint.height, hash);

        Ok(Self {
            config,
            admin,
            relayers: BTreeSet::new(),
            pow,
            headers,
            canonical,
            tip,
            checkpoint: hash,
            journal,
        })
    }

    /// Rebuild a relay from persisted headers and tip.
    ///
    /// The canonical index is recomputed by walking back from the tip to the
    /// checkpoint.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        config: RelayConfig,
        admin: AccountId,
        pow: Arc<dyn PowOracle>,
        checkpoint: BlockHash,
        headers: Vec<BlockHeader>,
        tip: ChainTip,
        relayers: BTreeSet<AccountId>,
    ) -> Result<Self, RelayError> {
        let headers: HashMap<BlockHash, BlockHeader> =
            headers.into_iter().map(|h| (h.hash, h)).collect();

        let mut canonical = BTreeMap::new();
        let mut cursor = headers
            .get(&tip.hash)
            .ok_or(RelayError::UnknownHeader(tip.hash))?;
        loop {
            canonical.insert(cursor.height, cursor.hash);
            if cursor.hash == checkpoint {
                break;
            }
            cursor = headers
                .get(&cursor.prev_hash)
                .ok_or(RelayError::UnknownParent(cursor.prev_hash))?;
        }

        debug!(
            target: "zbridge::relay",
            headers = headers.len(),
            tip = %tip.hash,
            height = tip.height,
            "Relay restored"
        );

        Ok(Self {
            config,
            admin,
            relayers,
            pow,
            headers,
            canonical,
            tip,
            checkpoint,
            journal: Journal::new(),
        })
    }

    // ------------------------------------------------------------------------
    // Relayer set
    // ------------------------------------------------------------------------

    pub fn add_relayer(&mut self, caller: &AccountId, relayer: AccountId) -> Result<(), RelayError> {
        self.require_admin(caller)?;
        if self.relayers.insert(relayer) {
            self.journal.record(StateChange::Relayers);
            info!(target: "zbridge::relay", relayer = %relayer, "Relayer added");
        }
        Ok(())
    }

    pub fn remove_relayer(
        &mut self,
        caller: &AccountId,
        relayer: &AccountId,
    ) -> Result<(), RelayError> {
        self.require_admin(caller)?;
        if self.relayers.remove(relayer) {
            self.journal.record(StateChange::Relayers);
            info!(target: "zbridge::relay", relayer = %relayer, "Relayer removed");
        }
        Ok(())
    }

    pub fn is_relayer(&self, account: &AccountId) -> bool {
        self.relayers.contains(account)
    }

    pub fn relayers(&self) -> &BTreeSet<AccountId> {
        &self.relayers
    }

    fn require_admin(&self, caller: &AccountId) -> Result<(), RelayError> {
        if *caller != self.admin {
            return Err(RelayError::NotAdmin(*caller));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    /// Verify and store one header.
    ///
    /// Nothing is modified unless every check passes.
    pub fn submit_header(
        &mut self,
        caller: &AccountId,
        raw_header: &[u8],
        claimed_height: u64,
    ) -> Result<SubmitOutcome, RelayError> {
        if !self.is_relayer(caller) {
            return Err(RelayError::NotRelayer(*caller));
        }

        let parsed = ParsedHeader::parse(raw_header)?;
        let hash = hash256_personalized(raw_header, self.config.personalization());

        if self.headers.contains_key(&hash) {
            debug!(target: "zbridge::relay", hash = %hash, "Duplicate header ignored");
            return Err(RelayError::DuplicateHeader(hash));
        }

        let parent = self
            .headers
            .get(&parsed.prev_hash)
            .ok_or(RelayError::UnknownParent(parsed.prev_hash))?;
        if !parent.verified {
            return Err(RelayError::ParentNotVerified(parent.hash));
        }
        let expected = parent.height + 1;
        if claimed_height != expected {
            return Err(RelayError::WrongHeight {
                expected,
                claimed: claimed_height,
            });
        }

        match self.pow.verify_work(raw_header, parsed.bits) {
            Ok(true) => {}
            Ok(false) => {
                warn!(target: "zbridge::relay", hash = %hash, bits = parsed.bits, "PoW rejected");
                log_header_event(
                    "header_pow_rejected",
                    &hash.to_string(),
                    claimed_height,
                    false,
                    Some("work below declared target"),
                );
                return Err(RelayError::PowRejected(hash));
            }
            Err(e) => {
                warn!(target: "zbridge::relay", hash = %hash, error = %e, "PoW oracle failed");
                return Err(RelayError::PowUnavailable(e));
            }
        }

        let work = work_from_bits(parsed.bits)?;
        let cumulative_work = &parent.cumulative_work + work;
        let header = BlockHeader::from_parsed(hash, &parsed, expected, cumulative_work);

        let advances = header.cumulative_work > self.tip.cumulative_work;
        let extends_tip = parsed.prev_hash == self.tip.hash;

        // Branch walk happens before any mutation
        let reorg_branch = if advances && !extends_tip {
            Some(self.branch_to_canonical(&header)?)
        } else {
            None
        };

        self.headers.insert(hash, header.clone());
        self.journal.record(StateChange::Header(hash));

        let mut outcome = SubmitOutcome {
            hash,
            height: expected,
            tip_advanced: advances,
            reorg: None,
        };

        if !advances {
            debug!(
                target: "zbridge::relay",
                hash = %hash,
                height = expected,
                "Header stored on side branch"
            );
            return Ok(outcome);
        }

        let old_tip = std::mem::replace(&mut self.tip, ChainTip::of(&header));
        self.journal.record(StateChange::ChainTip);

        match reorg_branch {
            None => {
                self.canonical.insert(expected, hash);
                debug!(target: "zbridge::relay", hash = %hash, height = expected, "Tip extended");
            }
            Some((fork_point, fork_height, branch)) => {
                self.canonical.split_off(&(fork_height + 1));
                for (height, branch_hash) in branch {
                    self.canonical.insert(height, branch_hash);
                }

                let reorg = Reorg {
                    old_tip: old_tip.hash,
                    new_tip: hash,
                    fork_point,
                    fork_height,
                    depth: old_tip.height - fork_height,
                };
                warn!(
                    target: "zbridge::relay",
                    old_tip = %reorg.old_tip,
                    new_tip = %reorg.new_tip,
                    fork_point = %reorg.fork_point,
                    depth = reorg.depth,
                    "Chain reorganization"
                );
                log_header_event("chain_reorg", &hash.to_string(), expected, true, None);
                outcome.reorg = Some(reorg);
            }
        }

        Ok(outcome)
    }

    /// Submit headers in order, stopping at the first failure.
    ///
    /// Headers accepted before the failure stay stored.
    pub fn submit_header_batch(
        &mut self,
        caller: &AccountId,
        headers: &[(Vec<u8>, u64)],
    ) -> Result<Vec<SubmitOutcome>, RelayError> {
        let mut outcomes = Vec::with_capacity(headers.len());
        for (index, (raw, height)) in headers.iter().enumerate() {
            match self.submit_header(caller, raw, *height) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    return Err(RelayError::Batch {
                        index,
                        accepted: outcomes.len(),
                        source: Box::new(e),
                    })
                }
            }
        }
        Ok(outcomes)
    }

    /// Walk from `header` back to the canonical chain.
    ///
    /// Returns the fork point, its height and the new branch (ascending).
    fn branch_to_canonical(
        &self,
        header: &BlockHeader,
    ) -> Result<(BlockHash, u64, Vec<(u64, BlockHash)>), RelayError> {
        let mut branch = vec![(header.height, header.hash)];
        let mut cursor = self
            .headers
            .get(&header.prev_hash)
            .ok_or(RelayError::UnknownParent(header.prev_hash))?;

        while self.canonical.get(&cursor.height) != Some(&cursor.hash) {
            branch.push((cursor.height, cursor.hash));
            cursor = self
                .headers
                .get(&cursor.prev_hash)
                .ok_or(RelayError::UnknownParent(cursor.prev_hash))?;
        }

        branch.reverse();
        Ok((cursor.hash, cursor.height, branch))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_header(&self, hash: &BlockHash) -> Option<&BlockHeader> {
        self.headers.get(hash)
    }

    /// Canonical block at `height`
    pub fn get_hash_at_height(&self, height: u64) -> Option<BlockHash> {
        self.canonical.get(&height).copied()
    }

    pub fn get_chain_tip(&self) -> &ChainTip {
        &self.tip
    }

    pub fn checkpoint(&self) -> BlockHash {
        self.checkpoint
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn is_canonical(&self, hash: &BlockHash) -> bool {
        self.headers
            .get(hash)
            .map(|h| self.canonical.get(&h.height) == Some(hash))
            .unwrap_or(false)
    }

    /// Confirmations of a canonical block (the tip itself has 0)
    pub fn confirmations(&self, hash: &BlockHash) -> Option<u64> {
        let header = self.headers.get(hash)?;
        if !header.verified || !self.is_canonical(hash) {
            return None;
        }
        Some(self.tip.height.saturating_sub(header.height))
    }

    pub fn is_confirmed(&self, hash: &BlockHash) -> bool {
        self.confirmations(hash)
            .map(|c| c >= self.config.min_confirmations)
            .unwrap_or(false)
    }

    /// Header of a confirmed block, or why it is not usable yet
    pub fn require_confirmed(&self, hash: &BlockHash) -> Result<&BlockHeader, RelayError> {
        let header = self
            .headers
            .get(hash)
            .ok_or(RelayError::UnknownHeader(*hash))?;
        let confirmations = self.confirmations(hash).unwrap_or(0);
        if !self.is_confirmed(hash) {
            return Err(RelayError::NotConfirmed {
                hash: *hash,
                confirmations,
                required: self.config.min_confirmations,
            });
        }
        Ok(header)
    }

    pub fn get_sapling_root(&self, hash: &BlockHash) -> Result<Hash32, RelayError> {
        Ok(self.require_confirmed(hash)?.sapling_root)
    }

    /// Inclusion of a note commitment in a confirmed block's sapling tree
    pub fn verify_note_commitment(
        &self,
        block_hash: &BlockHash,
        note_commitment: &Hash32,
        proof: &MerkleProof,
    ) -> Result<bool, RelayError> {
        let root = self.get_sapling_root(block_hash)?;
        Ok(merkle::verify_with_depth(
            note_commitment,
            &root,
            proof,
            self.config.merkle_depth,
        )?)
    }

    /// Inclusion of a transaction in a confirmed block.
    ///
    /// Transaction trees are not fixed depth; the proof's own length is used.
    pub fn verify_transaction(
        &self,
        block_hash: &BlockHash,
        txid: &Hash32,
        proof: &MerkleProof,
    ) -> Result<bool, RelayError> {
        let root = self.require_confirmed(block_hash)?.merkle_root;
        Ok(merkle::verify_with_depth(txid, &root, proof, proof.depth())?)
    }

    /// Every stored header, unordered
    pub fn headers(&self) -> impl Iterator<Item = &BlockHeader> {
        self.headers.values()
    }

    pub(crate) fn drain_changes(&mut self) -> Vec<StateChange> {
        self.journal.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::pow::{AcceptAllPowOracle, MockPowOracle};

    const BITS: u32 = 0x207f_ffff;

    fn admin() -> AccountId {
        AccountId([0xad; 32])
    }

    fn relayer() -> AccountId {
        AccountId([0x01; 32])
    }

    fn raw(prev: BlockHash, nonce: u8, bits: u32) -> Vec<u8> {
        ParsedHeader {
            version: 4,
            prev_hash: prev,
            merkle_root: Hash32([0x22; 32]),
            sapling_root: Hash32([0x33; 32]),
            timestamp: 1_700_000_000 + u32::from(nonce),
            bits,
            nonce: [nonce; 32],
        }
        .to_bytes()
    }

    fn relay_with(pow: Arc<dyn PowOracle>) -> Relay {
        let checkpoint = Checkpoint {
            raw_header: raw(Hash32::ZERO, 0, BITS),
            height: 100,
            chain_work: None,
        };
        let mut relay = Relay::new(RelayConfig::default(), admin(), pow, checkpoint).unwrap();
        relay.add_relayer(&admin(), relayer()).unwrap();
        relay
    }

    fn relay() -> Relay {
        relay_with(Arc::new(AcceptAllPowOracle))
    }

    fn extend(relay: &mut Relay, from: BlockHash, count: u8, salt: u8) -> Vec<BlockHash> {
        let mut prev = from;
        let mut height = relay.get_header(&from).unwrap().height;
        let mut hashes = Vec::new();
        for i in 0..count {
            height += 1;
            let out = relay
                .submit_header(&relayer(), &raw(prev, salt.wrapping_add(i), BITS), height)
                .unwrap();
            prev = out.hash;
            hashes.push(out.hash);
        }
        hashes
    }

    #[test]
    fn test_checkpoint_is_tip() {
        let relay = relay();
        let tip = relay.get_chain_tip();
        assert_eq!(tip.hash, relay.checkpoint());
        assert_eq!(tip.height, 100);
        assert_eq!(tip.cumulative_work, BigUint::from(2u32));
        assert_eq!(relay.get_hash_at_height(100), Some(relay.checkpoint()));
    }

    #[test]
    fn test_confirmed_after_six_children() {
        let mut relay = relay();
        let h0 = relay.checkpoint();

        let children = extend(&mut relay, h0, 5, 1);
        assert!(!relay.is_confirmed(&h0));
        assert!(matches!(
            relay.require_confirmed(&h0),
            Err(RelayError::NotConfirmed { confirmations: 5, required: 6, .. })
        ));

        extend(&mut relay, children[4], 1, 50);
        assert!(relay.is_confirmed(&h0));
        assert!(!relay.is_confirmed(&children[0]));
    }

    #[test]
    fn test_skipped_height_rejected_without_change() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let before = relay.get_chain_tip().clone();

        let result = relay.submit_header(&relayer(), &raw(h0, 1, BITS), 102);
        assert!(matches!(
            result,
            Err(RelayError::WrongHeight { expected: 101, claimed: 102 })
        ));
        assert_eq!(relay.get_chain_tip(), &before);
        assert_eq!(relay.header_count(), 1);
    }

    #[test]
    fn test_resubmission_does_not_move_tip() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let header = raw(h0, 1, BITS);

        relay.submit_header(&relayer(), &header, 101).unwrap();
        let tip = relay.get_chain_tip().clone();

        let err = relay.submit_header(&relayer(), &header, 101).unwrap_err();
        assert!(matches!(err, RelayError::DuplicateHeader(_)));
        assert_eq!(relay.get_chain_tip(), &tip);
    }

    #[test]
    fn test_unknown_parent_is_retryable() {
        let mut relay = relay();
        let err = relay
            .submit_header(&relayer(), &raw(Hash32([9; 32]), 1, BITS), 101)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    }

    #[test]
    fn test_only_relayers_submit() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let stranger = AccountId([0x77; 32]);

        let err = relay
            .submit_header(&stranger, &raw(h0, 1, BITS), 101)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        assert!(matches!(
            relay.add_relayer(&stranger, stranger),
            Err(RelayError::NotAdmin(_))
        ));
        relay.remove_relayer(&admin(), &relayer()).unwrap();
        assert!(!relay.is_relayer(&relayer()));
    }

    #[test]
    fn test_pow_rejection_and_oracle_failure() {
        let mut oracle = MockPowOracle::new();
        oracle.expect_oracle_type().return_const("mock");
        // nonce byte 1 fails the work check, anything else hits an outage
        oracle.expect_verify_work().returning(|header, _| {
            if header[108] == 1 {
                Ok(false)
            } else {
                Err(PowError::Unavailable("timeout".to_string()))
            }
        });

        let mut relay = relay_with(Arc::new(oracle));
        let h0 = relay.checkpoint();

        let err = relay.submit_header(&relayer(), &raw(h0, 1, BITS), 101).unwrap_err();
        assert!(matches!(err, RelayError::PowRejected(_)));
        assert!(!err.is_retryable());

        let err = relay.submit_header(&relayer(), &raw(h0, 2, BITS), 101).unwrap_err();
        assert!(matches!(err, RelayError::PowUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(relay.header_count(), 1);
    }

    #[test]
    fn test_higher_work_branch_wins_and_reports_reorg() {
        let mut relay = relay();
        let h0 = relay.checkpoint();

        // Main branch: two easy blocks (work 2 each)
        let main = extend(&mut relay, h0, 2, 1);
        assert_eq!(relay.get_chain_tip().hash, main[1]);

        // Competing single block with far more work, submitted second
        let heavy = raw(h0, 200, 0x1f07_ffff);
        let out = relay.submit_header(&relayer(), &heavy, 101).unwrap();

        assert!(out.tip_advanced);
        let reorg = out.reorg.unwrap();
        assert_eq!(reorg.old_tip, main[1]);
        assert_eq!(reorg.new_tip, out.hash);
        assert_eq!(reorg.fork_point, h0);
        assert_eq!(reorg.depth, 2);

        assert_eq!(relay.get_chain_tip().hash, out.hash);
        assert_eq!(relay.get_hash_at_height(101), Some(out.hash));
        assert_eq!(relay.get_hash_at_height(102), None);
        assert!(!relay.is_canonical(&main[0]));
    }

    #[test]
    fn test_equal_work_keeps_incumbent() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let first = extend(&mut relay, h0, 1, 1);

        let out = relay.submit_header(&relayer(), &raw(h0, 99, BITS), 101).unwrap();
        assert!(!out.tip_advanced);
        assert_eq!(relay.get_chain_tip().hash, first[0]);
        assert!(relay.get_header(&out.hash).is_some());
    }

    #[test]
    fn test_side_branch_overtakes_after_growing() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let main = extend(&mut relay, h0, 2, 1);
        let side = extend(&mut relay, h0, 3, 100);

        assert_eq!(relay.get_chain_tip().hash, side[2]);
        assert_eq!(relay.get_hash_at_height(101), Some(side[0]));
        assert!(!relay.is_canonical(&main[1]));
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let first = raw(h0, 1, BITS);
        let first_hash = hash256_personalized(&first, relay.config().personalization());

        let batch = vec![
            (first, 101),
            (raw(first_hash, 2, BITS), 103),
            (raw(first_hash, 3, BITS), 102),
        ];
        let err = relay.submit_header_batch(&relayer(), &batch).unwrap_err();
        match err {
            RelayError::Batch { index, accepted, .. } => {
                assert_eq!(index, 1);
                assert_eq!(accepted, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(relay.header_count(), 2);
    }

    #[test]
    fn test_inclusion_queries_require_confirmation() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let proof = MerkleProof::new(vec![Hash32::ZERO; TREE_DEPTH], 0);

        assert!(matches!(
            relay.verify_note_commitment(&h0, &Hash32::ZERO, &proof),
            Err(RelayError::NotConfirmed { .. })
        ));

        extend(&mut relay, h0, 6, 1);
        assert_eq!(relay.get_sapling_root(&h0).unwrap(), Hash32([0x33; 32]));
        assert!(!relay
            .verify_note_commitment(&h0, &Hash32::ZERO, &proof)
            .unwrap());

        let short = MerkleProof::new(vec![Hash32::ZERO; 3], 0);
        assert!(matches!(
            relay.verify_note_commitment(&h0, &Hash32::ZERO, &short),
            Err(RelayError::MerkleProof(MerkleError::WrongLength { .. }))
        ));
    }

    #[test]
    fn test_restore_rebuilds_canonical_index() {
        let mut relay = relay();
        let h0 = relay.checkpoint();
        let main = extend(&mut relay, h0, 3, 1);
        extend(&mut relay, h0, 1, 100);

        let restored = Relay::restore(
            RelayConfig::default(),
            admin(),
            Arc::new(AcceptAllPowOracle),
            relay.checkpoint(),
            relay.headers().cloned().collect(),
            relay.get_chain_tip().clone(),
            relay.relayers().clone(),
        )
        .unwrap();

        for (i, hash) in main.iter().enumerate() {
            assert_eq!(restored.get_hash_at_height(101 + i as u64), Some(*hash));
        }
        assert_eq!(restored.header_count(), 5);
        assert!(restored.is_relayer(&relayer()));
    }
}
