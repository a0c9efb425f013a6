//! Shared fakes and builders for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use zbridge::crypto::{
    compute_note_commitment, compute_root, compute_value_commitment, derive_blinding_factor,
    FieldElement, MerkleProof, TREE_DEPTH,
};
use zbridge::relay::ParsedHeader;
use zbridge::*;

pub const T0: u64 = 1_700_000_000;
pub const EASY_BITS: u32 = 0x207f_ffff;
pub const USER_KEY: [u8; 32] = [0x5a; 32];

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

/// Verifier with a fixed answer that can be flipped mid-test
#[derive(Debug)]
pub struct FixedVerifier {
    accept: AtomicBool,
}

impl FixedVerifier {
    pub fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept: AtomicBool::new(accept),
        })
    }

    pub fn set(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }
}

impl ProofVerifier for FixedVerifier {
    fn verify(
        &self,
        _proof: &Groth16Proof,
        _public_inputs: &[FieldElement],
        _vk: VerificationKeyId,
    ) -> std::result::Result<bool, VerifierError> {
        Ok(self.accept.load(Ordering::SeqCst))
    }
}

/// Verifier that is always down
#[derive(Debug, Default)]
pub struct OfflineVerifier;

impl ProofVerifier for OfflineVerifier {
    fn verify(
        &self,
        _proof: &Groth16Proof,
        _public_inputs: &[FieldElement],
        _vk: VerificationKeyId,
    ) -> std::result::Result<bool, VerifierError> {
        Err(VerifierError::Unavailable("offline".into()))
    }
}

/// Serialized header with the fields the tests care about
pub fn header(prev: BlockHash, bits: u32, sapling_root: Hash32, salt: u8) -> Vec<u8> {
    ParsedHeader {
        version: 4,
        prev_hash: prev,
        merkle_root: Hash32([0x22; 32]),
        sapling_root,
        timestamp: 1_700_000_000,
        bits,
        nonce: [salt; 32],
    }
    .to_bytes()
}

pub fn checkpoint(height: u64) -> Checkpoint {
    Checkpoint {
        raw_header: header(Hash32::ZERO, EASY_BITS, Hash32::ZERO, 0),
        height,
        chain_work: None,
    }
}

pub fn relay() -> Relay {
    let mut relay = Relay::new(
        RelayConfig::default(),
        admin(),
        Arc::new(AcceptAllPowOracle),
        checkpoint(1_000),
    )
    .unwrap();
    relay.add_relayer(&admin(), relayer()).unwrap();
    relay
}

/// Extend the current tip by `count` empty blocks
pub fn extend(relay: &mut Relay, count: u8, salt: u8) -> Vec<BlockHash> {
    let mut hashes = Vec::new();
    for i in 0..count {
        let tip = relay.get_chain_tip().clone();
        let raw = header(tip.hash, EASY_BITS, Hash32::ZERO, salt.wrapping_add(i));
        hashes.push(relay.submit_header(&relayer(), &raw, tip.height + 1).unwrap().hash);
    }
    hashes
}

/// Mine a block containing `leaf` and bury it under `confirmations` blocks
pub fn include_note(relay: &mut Relay, leaf: &Hash32, confirmations: u8) -> (BlockHash, MerkleProof) {
    let siblings = (0..TREE_DEPTH).map(|i| Hash32([i as u8 + 1; 32])).collect();
    let proof = MerkleProof::new(siblings, 5);
    let root = compute_root(leaf, &proof);

    let tip = relay.get_chain_tip().clone();
    let block = relay
        .submit_header(&relayer(), &header(tip.hash, EASY_BITS, root, 0x40), tip.height + 1)
        .unwrap()
        .hash;
    extend(relay, confirmations, 0x50);
    (block, proof)
}

/// Bridge with one registered vault and a verifier the caller controls
pub fn bridge(verifier: Arc<dyn ProofVerifier>, token: InMemoryToken) -> Bridge {
    let mut vaults = VaultRegistry::new(VaultConfig::default(), oracle(), 1, verifier.clone());
    vaults.register(&vault(), vault_address(), 1_000_000).unwrap();
    Bridge::new(BridgeConfig::default(), relay(), vaults, verifier, Box::new(token))
}

/// Pay the vault under permit `nonce` and build the matching mint
pub fn pay_vault(bridge: &mut Bridge, nonce: u64, value: u64) -> MintTransfer {
    let address = vault_address();
    let rcm = derive_blinding_factor(nonce, &USER_KEY);
    let note_commitment = compute_note_commitment(&address.d, &address.pk_d, value, &rcm);
    let (block_hash, inclusion_proof) = include_note(bridge.relay_mut(), &note_commitment, 6);

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
        proof: Groth16Proof::default(),
    }
}

/// Burn `amount` wrapped tokens against the test vault
pub fn burn_transfer(bridge: &Bridge, amount: u64, destination: Hash32) -> BurnTransfer {
    let fee = bridge.config().fee_for(amount);
    let amount_blinding = Blinding::from_bytes([0x31; 32]);
    let fee_blinding = Blinding::from_bytes([0x03; 32]);

    BurnTransfer {
        vault: vault(),
        amount,
        cv: compute_value_commitment(amount, &amount_blinding),
        amount_blinding,
        cvn: compute_value_commitment(amount - fee, &(amount_blinding - fee_blinding)),
        fee_blinding,
        requested_note_commitment: destination,
        encrypted_destination: vec![0xdd; 48],
    }
}
