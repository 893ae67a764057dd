//! The Utreexo accumulator: a hash-based set commitment over a forest of
//! perfect binary trees, supporting additions, batched deletions, and
//! stateless membership proofs.
//!
//! The driver in this module (`Accumulator::add`/`remove`/`verify`) is
//! written once, generically, against the [`Forest`] capability trait;
//! [`ram_forest::RamForest`] and [`pollard::Pollard`] each supply their own
//! storage strategy underneath it. Dispatch is static (`Accumulator<F>`
//! monomorphizes per back-end) rather than through `dyn Forest`, since the
//! rehash loop in `remove` is the hot path or close to it.

pub mod node_hash;
pub mod pollard;
pub mod proof;
pub mod ram_forest;
pub mod types;
pub mod util;

use std::collections::HashSet;

pub use node_hash::NodeHash;
pub use pollard::Pollard;
pub use proof::BatchProof;
pub use ram_forest::RamForest;
pub use types::{AccumulatorError, Leaf, Result};
pub use util::ForestState;

/// The storage/shape primitives a forest back-end must provide so that the
/// generic [`Accumulator`] driver can add, remove, and verify against it.
///
/// A "node" is never reified as a value here: every operation addresses the
/// forest by packed position (see [`ForestState`]), which is exactly how
/// `RamForest` already thinks and maps cleanly enough onto `Pollard`'s
/// niece-pointer walk that a shared node-handle type isn't worth the
/// lifetime plumbing it would need.
pub trait Forest {
    /// The positional state this forest currently occupies.
    fn state(&self) -> ForestState;

    /// Appends one leaf and performs whatever root merges its new height
    /// triggers (`new_leaf` + `merge_root` from the design, folded into one
    /// step since every merge this leaf causes is this back-end's own
    /// business).
    fn add_leaf(&mut self, leaf: Leaf) -> Result<()>;

    /// Hints that `additional` leaves are about to be added, letting a
    /// back-end pre-size its storage instead of growing it row by row.
    fn reserve(&mut self, _additional: u64) {}

    /// Swaps the subtrees rooted at `from` and `to` (same row), returning
    /// the positions whose stored hash is now stale, bottom-up.
    fn swap_sub_trees(&mut self, from: u64, to: u64) -> Result<Vec<u64>>;

    /// Recomputes the hash at `pos` from its current children.
    fn rehash(&mut self, pos: u64) -> Result<()>;

    /// Drops everything beyond `next_state`'s leaf count and adopts it as
    /// the forest's new state.
    fn finalize_remove(&mut self, next_state: ForestState) -> Result<()>;

    /// Current root hashes, tallest tree first.
    fn roots(&self) -> Vec<NodeHash>;
}

/// A Utreexo accumulator over some back-end `F`.
#[derive(Debug, Clone, Default)]
pub struct Accumulator<F> {
    forest: F,
}

impl<F: Forest> Accumulator<F> {
    pub fn new(forest: F) -> Self {
        Accumulator { forest }
    }

    pub fn num_leaves(&self) -> u64 {
        self.forest.state().num_leaves
    }

    pub fn roots(&self) -> Vec<NodeHash> {
        self.forest.roots()
    }

    pub fn forest(&self) -> &F {
        &self.forest
    }

    pub fn forest_mut(&mut self) -> &mut F {
        &mut self.forest
    }

    /// Appends `leaves` to the forest, merging roots of matching height as
    /// it goes.
    pub fn add(&mut self, leaves: &[Leaf]) -> Result<()> {
        self.forest.reserve(leaves.len() as u64);
        for leaf in leaves {
            self.forest.add_leaf(*leaf)?;
        }
        Ok(())
    }

    /// Deletes the leaves at `targets` (row-0 positions), rewriting the
    /// forest so every surviving leaf is reachable from a root again.
    ///
    /// All-or-nothing: `targets` is validated in full before any back-end
    /// mutation is performed.
    pub fn remove(&mut self, targets: &[u64]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }

        let state = self.forest.state();
        let mut sorted: Vec<u64> = targets.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != targets.len() {
            return Err(AccumulatorError::InvariantViolation(
                "duplicate position in removal targets",
            ));
        }
        for &pos in &sorted {
            if pos >= state.num_leaves {
                return Err(AccumulatorError::PositionOutOfRange(pos));
            }
        }

        let mut current = sorted;
        let rows = state.num_rows();
        for row in 0..rows {
            let target_set: HashSet<u64> = current.iter().copied().collect();
            let row_leaf_count = state.num_leaves >> row;
            let row_start = state.row_offset(row);
            let mut rightmost_available = row_start + row_leaf_count;

            let mut next = Vec::new();
            let mut i = 0;
            while i < current.len() {
                let pos = current[i];
                if state.has_root(row) && state.root_position(row) == pos {
                    // The whole subtree at this root is being deleted
                    // outright; nothing propagates upward for it.
                    i += 1;
                    continue;
                }

                let sib = pos ^ 1;
                let paired = i + 1 < current.len() && current[i + 1] == sib;

                if !paired {
                    loop {
                        rightmost_available -= 1;
                        if !target_set.contains(&rightmost_available) {
                            break;
                        }
                    }
                    let twin = rightmost_available;
                    // `twin` is never itself a target, so `twin != pos`
                    // always; the swap only needs to run when `pos` still
                    // lies inside the surviving region (`twin > pos`). When
                    // `twin < pos`, `pos` is already past the survivor
                    // boundary and nothing needs to move into it.
                    if twin > pos {
                        let spine = self.forest.swap_sub_trees(twin, pos)?;
                        for dirty in spine {
                            self.forest.rehash(dirty)?;
                        }
                    }
                }

                next.push(state.parent(pos));
                i += if paired { 2 } else { 1 };
            }

            next.sort_unstable();
            next.dedup();
            current = next;
        }

        let next_state = ForestState::new(state.num_leaves - targets.len() as u64);
        self.forest.finalize_remove(next_state)
    }

    /// Checks `proof` against this accumulator's current roots.
    pub fn verify(&self, proof: &BatchProof, target_hashes: &[NodeHash]) -> Result<bool> {
        let state = self.forest.state();
        let reconstructed = proof.compute_roots(&state, target_hashes)?;
        let roots = self.forest.roots();
        let root_positions = state.root_positions();

        for (pos, hash) in &reconstructed {
            let idx = root_positions
                .iter()
                .position(|p| p == pos)
                .ok_or(AccumulatorError::VerifyFailed(
                    "reconstructed root is not a root of this forest",
                ))?;
            if roots[idx] != *hash {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Accumulator<RamForest> {
    /// Builds a proof that `target_hashes` are members. Only the full-forest
    /// back-end can serve proofs: a pruned `Pollard` may not hold the
    /// sibling data a proof needs.
    pub fn prove(&self, target_hashes: &[NodeHash]) -> Result<BatchProof> {
        self.forest.prove(target_hashes)
    }
}
