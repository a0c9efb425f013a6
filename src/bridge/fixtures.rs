//! Shared setup for the issue and redeem unit tests

use std::sync::Arc;

use super::orchestrator::Bridge;
use super::token::InMemoryToken;
use super::types::BridgeConfig;
use crate::crypto::groth16::MockProofVerifier;
use crate::crypto::merkle::{compute_root, MerkleProof, TREE_DEPTH};
use crate::crypto::{
    compute_note_commitment, compute_value_commitment, derive_blinding_factor, Blinding,
    ShieldedAddress,
};
use crate::relay::{AcceptAllPowOracle, Checkpoint, ParsedHeader, Relay, RelayConfig};
use crate::types::{AccountId, BlockHash, Hash32, MintTransfer};
use crate::vault::{VaultConfig, VaultRegistry};

pub const T0: u64 = 1_700_000_000;
pub const USER_KEY: [u8; 32] = [0x5a; 32];
pub const WARRANTY: u128 = 1_000;
pub const VAULT_COLLATERAL: u128 = 1_000_000;
pub const FUNDED: u64 = 100_000;

const BITS: u32 = 0x207f_ffff;

pub fn admin() -> AccountId {
    AccountId([0xad; 32])
}

pub fn relayer() -> AccountId {
    AccountId([0x01; 32])
}

pub fn oracle() -> AccountId {
    AccountId([0x0c; 32])
}

pub fn vault() -> AccountId {
    AccountId([0x0a; 32])
}

pub fn requester() -> AccountId {
    AccountId([0x0e; 32])
}

pub fn redeemer() -> AccountId {
    AccountId([0x0d; 32])
}

pub fn vault_address() -> ShieldedAddress {
    ShieldedAddress::new([0x11; 11], [0x12; 32])
}

fn raw_header(prev: BlockHash, sapling_root: Hash32, salt: u8) -> Vec<u8> {
    ParsedHeader {
        version: 4,
        prev_hash: prev,
        merkle_root: Hash32([0x22; 32]),
        sapling_root,
        timestamp: 1_700_000_000,
        bits: BITS,
        nonce: [salt; 32],
    }
    .to_bytes()
}

fn build(valid_proofs: bool, token: InMemoryToken) -> Bridge {
    let mut verifier = MockProofVerifier::new();
    verifier
        .expect_verify()
        .returning(move |_, _, _| Ok(valid_proofs));
    let verifier = Arc::new(verifier);

    let checkpoint = Checkpoint {
        raw_header: raw_header(Hash32::ZERO, Hash32::ZERO, 0),
        height: 1_000,
        chain_work: None,
    };
    let mut relay = Relay::new(
        RelayConfig::default(),
        admin(),
        Arc::new(AcceptAllPowOracle),
        checkpoint,
    )
    .unwrap();
    relay.add_relayer(&admin(), relayer()).unwrap();

    let mut vaults = VaultRegistry::new(VaultConfig::default(), oracle(), 1, verifier.clone());
    vaults
        .register(&vault(), vault_address(), VAULT_COLLATERAL)
        .unwrap();

    Bridge::new(
        BridgeConfig::default(),
        relay,
        vaults,
        verifier,
        Box::new(token),
    )
}

/// Bridge with one registered vault and an empty token ledger
pub fn bridge(valid_proofs: bool) -> Bridge {
    build(valid_proofs, InMemoryToken::new())
}

/// Like [`bridge`], with `FUNDED` wrapped tokens held by the redeemer
pub fn funded_bridge(valid_proofs: bool) -> Bridge {
    build(
        valid_proofs,
        InMemoryToken::with_balances([(redeemer(), FUNDED)]),
    )
}

/// Mine a block whose sapling tree contains `leaf`, then `confirmations`
/// blocks on top of it.
pub fn include_note(bridge: &mut Bridge, leaf: &Hash32, confirmations: u8) -> (BlockHash, MerkleProof) {
    let siblings = (0..TREE_DEPTH).map(|i| Hash32([i as u8; 32])).collect();
    let proof = MerkleProof::new(siblings, 0b1011);
    let root = compute_root(leaf, &proof);

    let relay = bridge.relay_mut();
    let tip = relay.get_chain_tip().clone();
    let block = relay
        .submit_header(&relayer(), &raw_header(tip.hash, root, 1), tip.height + 1)
        .unwrap()
        .hash;

    let mut prev = block;
    for i in 0..confirmations {
        let height = relay.get_chain_tip().height + 1;
        prev = relay
            .submit_header(&relayer(), &raw_header(prev, Hash32::ZERO, 2 + i), height)
            .unwrap()
            .hash;
    }
    (block, proof)
}

/// Pay the vault under permit `nonce` and build the matching mint
pub fn pay_vault_with_depth(
    bridge: &mut Bridge,
    nonce: u64,
    value: u64,
    confirmations: u8,
) -> MintTransfer {
    let address = vault_address();
    let rcm = derive_blinding_factor(nonce, &USER_KEY);
    let note_commitment = compute_note_commitment(&address.d, &address.pk_d, value, &rcm);
    let (block_hash, inclusion_proof) = include_note(bridge, &note_commitment, confirmations);

    let fee = bridge.config().fee_for(value);
    let value_blinding = Blinding::from_bytes([0x21; 32]);
    let fee_blinding = Blinding::from_bytes([0x07; 32]);

    MintTransfer {
        value,
        cv: compute_value_commitment(value, &value_blinding),
        cvn: compute_value_commitment(value - fee, &(value_blinding - fee_blinding)),
        fee_blinding,
        note_commitment,
        block_hash,
        inclusion_proof,
        encrypted_note: vec![0xee; 64],
        proof: Default::default(),
    }
}

pub fn pay_vault(bridge: &mut Bridge, nonce: u64, value: u64) -> MintTransfer {
    pay_vault_with_depth(bridge, nonce, value, 6)
}
