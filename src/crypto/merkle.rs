//! Fixed-Depth Merkle Inclusion Proofs
//!
//! Proofs are folded leaf to root with double SHA-256. Bit `i` of the index
//! says which side the running node sits on at level `i`: 0 = left child,
//! 1 = right child. Only inclusion is provable; there are no non-membership
//! proofs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hash::hash_pair;
use crate::types::Hash32;

/// Depth of the backing chain's note commitment tree
pub const TREE_DEPTH: usize = 32;

/// Merkle proof errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("proof has {got} siblings, tree depth is {expected}")]
    WrongLength { expected: usize, got: usize },

    #[error("index {index} does not fit in a tree of depth {depth}")]
    IndexOutOfRange { index: u64, depth: usize },
}

/// Inclusion proof: siblings from leaf to root plus the leaf position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Sibling hashes, leaf level first
    pub siblings: Vec<Hash32>,
    /// Leaf position; bit `i` is the side at level `i`
    pub index: u64,
}

impl MerkleProof {
    pub fn new(siblings: Vec<Hash32>, index: u64) -> Self {
        Self { siblings, index }
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Reject anything that is not exactly a `depth`-level proof
    pub fn check_shape(&self, depth: usize) -> Result<(), MerkleError> {
        if self.siblings.len() != depth {
            return Err(MerkleError::WrongLength {
                expected: depth,
                got: self.siblings.len(),
            });
        }
        if depth < 64 && self.index >> depth != 0 {
            return Err(MerkleError::IndexOutOfRange {
                index: self.index,
                depth,
            });
        }
        Ok(())
    }
}

/// Fold the proof over `leaf`. Performs no length check.
pub fn compute_root(leaf: &Hash32, proof: &MerkleProof) -> Hash32 {
    let mut current = *leaf;
    let mut index = proof.index;

    for sibling in &proof.siblings {
        current = if index & 1 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        index >>= 1;
    }

    current
}

/// Verify inclusion of `leaf` under `root` in a tree of `depth` levels.
///
/// A malformed proof is an error; a well-formed proof that folds to a
/// different root is `Ok(false)`.
pub fn verify_with_depth(
    leaf: &Hash32,
    root: &Hash32,
    proof: &MerkleProof,
    depth: usize,
) -> Result<bool, MerkleError> {
    proof.check_shape(depth)?;
    Ok(compute_root(leaf, proof) == *root)
}

/// Verify inclusion in a [`TREE_DEPTH`]-level tree
pub fn verify(leaf: &Hash32, root: &Hash32, proof: &MerkleProof) -> Result<bool, MerkleError> {
    verify_with_depth(leaf, root, proof, TREE_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    fn random_hash(rng: &mut impl RngCore) -> Hash32 {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Hash32(bytes)
    }

    fn random_proof(rng: &mut impl RngCore) -> (Hash32, MerkleProof) {
        let leaf = random_hash(rng);
        let siblings = (0..TREE_DEPTH).map(|_| random_hash(rng)).collect();
        let index = u64::from(rng.gen::<u32>());
        (leaf, MerkleProof::new(siblings, index))
    }

    #[test]
    fn test_round_trip_32_levels() {
        let mut rng = rand::thread_rng();
        let (leaf, proof) = random_proof(&mut rng);
        let root = compute_root(&leaf, &proof);

        assert_eq!(verify(&leaf, &root, &proof), Ok(true));
    }

    #[test]
    fn test_flipped_sibling_bit_fails() {
        let mut rng = rand::thread_rng();
        let (leaf, proof) = random_proof(&mut rng);
        let root = compute_root(&leaf, &proof);

        for level in [0, 7, TREE_DEPTH - 1] {
            let mut tampered = proof.clone();
            tampered.siblings[level].0[level % 32] ^= 0x01;
            assert_eq!(verify(&leaf, &root, &tampered), Ok(false), "level {}", level);
        }
    }

    #[test]
    fn test_flipped_index_bit_fails() {
        let mut rng = rand::thread_rng();
        let (leaf, proof) = random_proof(&mut rng);
        let root = compute_root(&leaf, &proof);

        let mut tampered = proof.clone();
        tampered.index ^= 1 << 5;
        assert_eq!(verify(&leaf, &root, &tampered), Ok(false));
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        let mut rng = rand::thread_rng();
        let (leaf, mut proof) = random_proof(&mut rng);
        let root = compute_root(&leaf, &proof);
        proof.siblings.pop();

        assert_eq!(
            verify(&leaf, &root, &proof),
            Err(MerkleError::WrongLength {
                expected: TREE_DEPTH,
                got: TREE_DEPTH - 1
            })
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let proof = MerkleProof::new(vec![Hash32::ZERO; 4], 16);
        assert!(matches!(
            verify_with_depth(&Hash32::ZERO, &Hash32::ZERO, &proof, 4),
            Err(MerkleError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_small_tree_by_hand() {
        let leaves: Vec<Hash32> = (0u8..4).map(|i| Hash32([i; 32])).collect();
        let left = hash_pair(&leaves[0], &leaves[1]);
        let right = hash_pair(&leaves[2], &leaves[3]);
        let root = hash_pair(&left, &right);

        // leaf 2 is the left child of `right`, which is the right child of root
        let proof = MerkleProof::new(vec![leaves[3], left], 0b10);
        assert_eq!(verify_with_depth(&leaves[2], &root, &proof, 2), Ok(true));
        assert_eq!(verify_with_depth(&leaves[3], &root, &proof, 2), Ok(false));
    }
}
