//! Incremental MiMC Merkle tree over registered identity commitments.
//!
//! Production state is the O(depth) append path: per-level zero hashes, the
//! rightmost "filled subtree" hash of every level and the full history of
//! roots indexed by insertion count.  Layer-by-layer rebuilding exists only
//! as a read-only audit ([`IdentityTree::batch_root`]) and to extract
//! membership paths; it never feeds back into the stored roots.

use ark_ff::PrimeField;
use serde_json::json;
use thiserror::Error;

use crate::field::{to_decimal, Fr};
use crate::mimc::MimcSponge;
use crate::transcript::keccak256;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Depth used by the deployed circuits.
pub const DEFAULT_DEPTH: usize = 20;

/// Largest depth this tree accepts.
pub const MAX_DEPTH: usize = 32;

/// Seed of the empty-leaf value, `keccak256("tornado") mod r`.
pub const ZERO_LEAF_SEED: &[u8] = b"tornado";

/// Errors raised by tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("merkle tree is full ({capacity} leaves)")]
    /// Every leaf slot is occupied.
    Full {
        /// Number of leaves the tree can hold.
        capacity: u64,
    },
    #[error("leaf index {index} out of range (tree holds {len} leaves)")]
    /// A path was requested for a leaf that does not exist.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current leaf count.
        len: usize,
    },
    #[error("unsupported tree depth {0}")]
    /// The depth is zero or above [`MAX_DEPTH`].
    InvalidDepth(usize),
}

/// Value of an unoccupied leaf.
pub fn zero_leaf() -> Fr {
    Fr::from_be_bytes_mod_order(&keccak256(ZERO_LEAF_SEED))
}

/// Authentication path for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// Leaf the path starts from.
    pub leaf: Fr,
    /// Position of the leaf in insertion order.
    pub index: usize,
    /// Sibling hash at each level, bottom-up.
    pub elements: Vec<Fr>,
    /// `1` where the running node is a right child at that level.
    pub indices: Vec<u8>,
}

impl MerklePath {
    /// Folds the leaf up the path and returns the implied root.
    pub fn compute_root(&self, hasher: &MimcSponge) -> Fr {
        self.elements
            .iter()
            .zip(&self.indices)
            .fold(self.leaf, |node, (sibling, &bit)| {
                if bit == 0 {
                    hasher.hash_pair(node, *sibling)
                } else {
                    hasher.hash_pair(*sibling, node)
                }
            })
    }

    /// Checks whether the path recomputes `root`.
    pub fn verify(&self, hasher: &MimcSponge, root: &Fr) -> bool {
        self.elements.len() == self.indices.len() && self.compute_root(hasher) == *root
    }

    /// Renders the path in circuit-input form with decimal elements.
    pub fn to_json(&self) -> serde_json::Value {
        let elements: Vec<String> = self.elements.iter().map(to_decimal).collect();
        json!({
            "pathElements": elements,
            "pathIndices": self.indices,
            "index": self.index,
        })
    }
}

/// Fixed-depth append-only Merkle tree.
#[derive(Debug, Clone)]
pub struct IdentityTree {
    depth: usize,
    hasher: MimcSponge,
    zeros: Vec<Fr>,
    filled: Vec<Fr>,
    roots: Vec<Fr>,
    leaves: Vec<Fr>,
}

impl IdentityTree {
    /// Creates an empty tree of the given depth.
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth(depth));
        }
        let hasher = MimcSponge::new();
        let mut zeros = Vec::with_capacity(depth + 1);
        zeros.push(zero_leaf());
        for level in 0..depth {
            let below = zeros[level];
            zeros.push(hasher.hash_pair(below, below));
        }
        let filled = zeros[..depth].to_vec();
        let roots = vec![zeros[depth]];
        Ok(Self {
            depth,
            hasher,
            zeros,
            filled,
            roots,
            leaves: Vec::new(),
        })
    }

    /// Tree depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum number of leaves.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Number of inserted leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether no leaf has been inserted.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Inserted leaves in insertion order.
    pub fn leaves(&self) -> &[Fr] {
        &self.leaves
    }

    /// Zero-subtree hash at `level` (`0` is the empty leaf).
    pub fn zero(&self, level: usize) -> Option<Fr> {
        self.zeros.get(level).copied()
    }

    /// Hasher shared by every level of the tree.
    pub fn hasher(&self) -> &MimcSponge {
        &self.hasher
    }

    /// Appends `leaf` and returns its index.
    ///
    /// A full tree is left untouched.
    pub fn insert(&mut self, leaf: Fr) -> Result<usize, TreeError> {
        let index = self.leaves.len();
        if index as u64 >= self.capacity() {
            return Err(TreeError::Full {
                capacity: self.capacity(),
            });
        }
        let mut node = leaf;
        let mut position = index;
        for level in 0..self.depth {
            node = if position % 2 == 0 {
                self.filled[level] = node;
                self.hasher.hash_pair(node, self.zeros[level])
            } else {
                self.hasher.hash_pair(self.filled[level], node)
            };
            position >>= 1;
        }
        self.roots.push(node);
        self.leaves.push(leaf);
        Ok(index)
    }

    /// Root after the most recent insertion.
    pub fn current_root(&self) -> Fr {
        // roots[0] is the empty root and is never removed.
        self.roots[self.roots.len() - 1]
    }

    /// Root after exactly `version` insertions.
    pub fn root_at(&self, version: usize) -> Option<Fr> {
        self.roots.get(version).copied()
    }

    /// Whether `root` was the tree root at any version.
    pub fn is_known_root(&self, root: &Fr) -> bool {
        self.roots.iter().rev().any(|r| r == root)
    }

    /// First index holding `leaf`.
    pub fn index_of(&self, leaf: &Fr) -> Option<usize> {
        self.leaves.iter().position(|l| l == leaf)
    }

    /// Recomputes the root from the leaf sequence, layer by layer.
    pub fn batch_root(&self) -> Fr {
        self.layers()
            .last()
            .and_then(|top| top.first().copied())
            .unwrap_or(self.zeros[self.depth])
    }

    /// Authentication path for the leaf at `index`.
    pub fn path(&self, index: usize) -> Result<MerklePath, TreeError> {
        if index >= self.leaves.len() {
            return Err(TreeError::IndexOutOfRange {
                index,
                len: self.leaves.len(),
            });
        }
        let layers = self.layers();
        let mut elements = Vec::with_capacity(self.depth);
        let mut indices = Vec::with_capacity(self.depth);
        let mut position = index;
        for level in 0..self.depth {
            indices.push((position % 2) as u8);
            let sibling = layers[level]
                .get(position ^ 1)
                .copied()
                .unwrap_or(self.zeros[level]);
            elements.push(sibling);
            position >>= 1;
        }
        Ok(MerklePath {
            leaf: self.leaves[index],
            index,
            elements,
            indices,
        })
    }

    fn layers(&self) -> Vec<Vec<Fr>> {
        let mut layers = Vec::with_capacity(self.depth + 1);
        layers.push(self.leaves.clone());
        for level in 0..self.depth {
            let next = hash_layer(&self.hasher, &layers[level], self.zeros[level]);
            layers.push(next);
        }
        layers
    }
}

fn hash_layer(hasher: &MimcSponge, nodes: &[Fr], zero: Fr) -> Vec<Fr> {
    let pair = |chunk: &[Fr]| hasher.hash_pair(chunk[0], chunk.get(1).copied().unwrap_or(zero));
    let use_parallel = {
        #[cfg(not(target_arch = "wasm32"))]
        {
            const PARALLEL_LAYER_THRESHOLD: usize = 1 << 10;
            nodes.len() >= PARALLEL_LAYER_THRESHOLD && rayon::current_num_threads() > 1
        }
        #[cfg(target_arch = "wasm32")]
        {
            false
        }
    };
    if use_parallel {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return nodes.par_chunks(2).map(pair).collect();
        }
    }
    nodes.chunks(2).map(pair).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::from_decimal;
    use proptest::prelude::*;

    fn fr(s: &str) -> Fr {
        from_decimal(s).unwrap()
    }

    #[test]
    fn zero_leaf_matches_tornado_constant() {
        assert_eq!(
            zero_leaf(),
            fr("21663839004416932945382355908790599225266501822907911457504978515578255421292")
        );
        let tree = IdentityTree::new(4).unwrap();
        assert_eq!(
            tree.zero(3).unwrap(),
            fr("14506027710748750947258687001455876266559341618222612722926156490737302846427")
        );
    }

    #[test]
    fn depth_twenty_known_roots() {
        let mut tree = IdentityTree::new(DEFAULT_DEPTH).unwrap();
        assert_eq!(tree.capacity(), 1 << 20);
        let empty =
            fr("18926336163373752588529320804722226672465218465546337267825102089394393880276");
        assert_eq!(tree.current_root(), empty);

        assert_eq!(tree.insert(Fr::from(1u64)).unwrap(), 0);
        assert_eq!(
            tree.current_root(),
            fr("4768177824216143055519640784977157311673229774898220393681621414098673579769")
        );
        tree.insert(Fr::from(2u64)).unwrap();
        tree.insert(Fr::from(3u64)).unwrap();
        let root = tree.current_root();
        assert_eq!(
            crate::field::to_hex(&root),
            "156c224f23b580116f1e543fc0b78ce38f1a4aa826f2460852cfbd0860da8dd8"
        );
        assert_eq!(tree.batch_root(), root);
        assert_eq!(tree.root_at(0), Some(empty));
        assert!(tree.is_known_root(&empty));
        assert_eq!(tree.root_at(4), None);
    }

    #[test]
    fn full_tree_rejects_and_is_unchanged() {
        let mut tree = IdentityTree::new(2).unwrap();
        for i in 0..4u64 {
            tree.insert(Fr::from(i + 10)).unwrap();
        }
        let root = tree.current_root();
        assert_eq!(
            tree.insert(Fr::from(99u64)),
            Err(TreeError::Full { capacity: 4 })
        );
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.current_root(), root);
        assert_eq!(tree.root_at(5), None);
    }

    #[test]
    fn rejects_unsupported_depths() {
        assert_eq!(IdentityTree::new(0).unwrap_err(), TreeError::InvalidDepth(0));
        assert_eq!(
            IdentityTree::new(MAX_DEPTH + 1).unwrap_err(),
            TreeError::InvalidDepth(MAX_DEPTH + 1)
        );
    }

    #[test]
    fn path_lookup_and_json() {
        let mut tree = IdentityTree::new(3).unwrap();
        for i in 1..=5u64 {
            tree.insert(Fr::from(i)).unwrap();
        }
        assert_eq!(tree.index_of(&Fr::from(4u64)), Some(3));
        assert_eq!(tree.index_of(&Fr::from(40u64)), None);
        let path = tree.path(3).unwrap();
        assert_eq!(path.indices, vec![1, 1, 0]);
        assert!(path.verify(tree.hasher(), &tree.current_root()));
        assert!(!path.verify(tree.hasher(), &tree.root_at(3).unwrap()));
        let value = path.to_json();
        assert_eq!(value["index"], 3);
        assert_eq!(value["pathElements"][0], "3");
        assert_eq!(value["pathIndices"].as_array().unwrap().len(), 3);
        assert_eq!(
            tree.path(5),
            Err(TreeError::IndexOutOfRange { index: 5, len: 5 })
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn incremental_root_matches_batch(values in proptest::collection::vec(any::<u64>(), 0..16)) {
            let mut tree = IdentityTree::new(4).unwrap();
            for (k, v) in values.iter().enumerate() {
                tree.insert(Fr::from(*v)).unwrap();
                prop_assert_eq!(tree.len(), k + 1);
            }
            prop_assert_eq!(tree.current_root(), tree.batch_root());
            for index in 0..tree.len() {
                let path = tree.path(index).unwrap();
                prop_assert!(path.verify(tree.hasher(), &tree.current_root()));
            }
        }
    }
}
