//! Binary Merkle tree over child leaf hashes.
//!
//! Leaves are sorted before the tree is built, so the root depends only on
//! the set of children. The leaf level is padded to the next power of two
//! by repeating the last leaf, so every inner level pairs up exactly.
//! Leaf and inner nodes are hashed under different contexts so a leaf can
//! never be replayed as an inner node.

use chrono::{DateTime, Utc};
use finality_types::{
    ContentHash, CryptographicViolation, HashDomain, StructuralViolation, Violation,
};
use serde::{Deserialize, Serialize};

fn leaf_node(leaf: &ContentHash) -> ContentHash {
    ContentHash::derive(HashDomain::MerkleLeaf, &[leaf.as_bytes()])
}

fn inner_node(left: &ContentHash, right: &ContentHash) -> ContentHash {
    ContentHash::derive(HashDomain::MerkleNode, &[left.as_bytes(), right.as_bytes()])
}

/// Hashed leaf level, padded with copies of the last leaf up to a power
/// of two. Empty input stays empty.
fn leaf_level(leaves: &[ContentHash]) -> Vec<ContentHash> {
    let mut level: Vec<ContentHash> = leaves.iter().map(leaf_node).collect();
    if let Some(&last) = level.last() {
        level.resize(level.len().next_power_of_two(), last);
    }
    level
}

fn next_level(level: &[ContentHash]) -> Vec<ContentHash> {
    level
        .chunks_exact(2)
        .map(|pair| inner_node(&pair[0], &pair[1]))
        .collect()
}

/// Root over `leaves` in the order given. `None` for an empty slice.
pub fn merkle_root(leaves: &[ContentHash]) -> Option<ContentHash> {
    let mut level = leaf_level(leaves);
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.first().copied()
}

/// Number of inner levels above `leaf_count` leaves.
pub fn tree_height(leaf_count: usize) -> u32 {
    if leaf_count == 0 {
        return 0;
    }
    leaf_count.next_power_of_two().trailing_zeros()
}

/// Merkle commitment over an O-PDO's children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeProof {
    pub merkle_root: ContentHash,
    /// Sorted leaf hashes, one per child.
    pub leaf_hashes: Vec<ContentHash>,
    pub tree_height: u32,
    pub generated_at: DateTime<Utc>,
    /// Random per-generation tag; not part of the root.
    pub nonce: String,
}

impl CompositeProof {
    /// Sort, reject duplicates, and build the tree twice from independent
    /// orderings. Both roots must agree.
    pub fn build(subject_id: &str, leaves: &[ContentHash]) -> Result<Self, Violation> {
        let mut sorted = leaves.to_vec();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(CryptographicViolation::HashCollision { leaf: pair[0] }.into());
        }
        let Some(first) = merkle_root(&sorted) else {
            return Err(StructuralViolation::EmptyChildSet.into());
        };

        let mut reordered: Vec<ContentHash> = leaves.iter().rev().copied().collect();
        reordered.sort();
        let second = merkle_root(&reordered).unwrap_or_else(ContentHash::zero);
        if first != second {
            return Err(CryptographicViolation::NonDeterministicHash {
                subject_id: subject_id.to_string(),
                first,
                second,
            }
            .into());
        }

        Ok(Self {
            merkle_root: first,
            tree_height: tree_height(sorted.len()),
            leaf_hashes: sorted,
            generated_at: Utc::now(),
            nonce: hex_nonce(),
        })
    }

    /// Recompute the root from the stored leaves.
    pub fn recompute(&self) -> Option<ContentHash> {
        let mut sorted = self.leaf_hashes.clone();
        sorted.sort();
        merkle_root(&sorted)
    }

    /// Root recomputes and matches.
    pub fn is_consistent(&self) -> bool {
        self.recompute() == Some(self.merkle_root)
    }

    pub fn inclusion_proof(&self, leaf: &ContentHash) -> Option<InclusionProof> {
        let index = self.leaf_hashes.iter().position(|l| l == leaf)?;
        inclusion_proof(&self.leaf_hashes, index)
    }
}

fn hex_nonce() -> String {
    rand::random::<[u8; 16]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Sibling path from a leaf to the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub index: usize,
    pub siblings: Vec<ContentHash>,
}

pub fn inclusion_proof(leaves: &[ContentHash], index: usize) -> Option<InclusionProof> {
    if index >= leaves.len() {
        return None;
    }
    let mut level = leaf_level(leaves);
    let mut position = index;
    let mut siblings = Vec::new();
    while level.len() > 1 {
        siblings.push(level[position ^ 1]);
        level = next_level(&level);
        position /= 2;
    }
    Some(InclusionProof { index, siblings })
}

pub fn verify_inclusion(leaf: &ContentHash, proof: &InclusionProof, root: &ContentHash) -> bool {
    let mut node = leaf_node(leaf);
    let mut position = proof.index;
    for sibling in &proof.siblings {
        node = if position % 2 == 0 {
            inner_node(&node, sibling)
        } else {
            inner_node(sibling, &node)
        };
        position /= 2;
    }
    &node == root
}
