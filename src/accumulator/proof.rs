//! [`BatchProof`]: an inert bundle of target positions and the sibling
//! hashes needed to recompute the roots they descend from.

use super::node_hash::NodeHash;
use super::types::{AccumulatorError, Result};
use super::util::ForestState;

/// A proof that a set of leaves, identified by row-0 position, are members
/// of the forest.
///
/// `targets` are row-0 positions, parallel to whatever `target_hashes` a
/// caller supplies to [`Self::compute_roots`] (same order, so the caller
/// never needs to know the position a hash resolves to). `hashes` are the
/// sibling hashes in the order [`ForestState::proof_positions`] emits them
/// (ascending row, ascending position within a row).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchProof {
    pub targets: Vec<u64>,
    pub hashes: Vec<NodeHash>,
}

impl BatchProof {
    pub fn new(targets: Vec<u64>, hashes: Vec<NodeHash>) -> Self {
        BatchProof { targets, hashes }
    }

    /// Reconstructs the roots implied by this proof against `target_hashes`
    /// (the leaf hashes being proven, in the same order as `self.targets`),
    /// returning the (position, hash) pairs for every root it was able to
    /// recompute.
    ///
    /// This is the shared reconstruction step behind `Accumulator::verify`
    /// on both back-ends: it never touches stored state, it only folds
    /// `targets`/`hashes`/`target_hashes` upward via `parent_hash`.
    pub fn compute_roots(
        &self,
        state: &ForestState,
        target_hashes: &[NodeHash],
    ) -> Result<Vec<(u64, NodeHash)>> {
        if self.targets.len() != target_hashes.len() {
            return Err(AccumulatorError::VerifyFailed(
                "target count does not match target hash count",
            ));
        }

        let mut known: std::collections::HashMap<u64, NodeHash> =
            std::collections::HashMap::with_capacity(self.targets.len() + self.hashes.len());
        for (&pos, &hash) in self.targets.iter().zip(target_hashes.iter()) {
            known.insert(pos, hash);
        }

        let mut sorted_targets = self.targets.clone();
        sorted_targets.sort_unstable();
        sorted_targets.dedup();

        let (proof_positions, _computable) = state.proof_positions(&sorted_targets);
        if proof_positions.len() != self.hashes.len() {
            return Err(AccumulatorError::VerifyFailed(
                "insufficient proof hashes for the given targets",
            ));
        }
        for (&pos, &hash) in proof_positions.iter().zip(self.hashes.iter()) {
            known.insert(pos, hash);
        }

        let mut roots = Vec::new();
        let mut current = sorted_targets;
        let rows = state.num_rows();
        for _ in 0..rows {
            let mut next = Vec::new();
            let mut i = 0;
            while i < current.len() {
                let pos = current[i];
                if state_is_root(state, pos) {
                    i += 1;
                    continue;
                }

                let parent_pos = state.parent(pos);
                let sib = pos ^ 1;
                let (left_pos, right_pos) = if pos < sib { (pos, sib) } else { (sib, pos) };

                let paired = i + 1 < current.len() && current[i + 1] == sib;
                let left_hash = *known
                    .get(&left_pos)
                    .ok_or(AccumulatorError::VerifyFailed("missing hash during root reconstruction"))?;
                let right_hash = *known
                    .get(&right_pos)
                    .ok_or(AccumulatorError::VerifyFailed("missing hash during root reconstruction"))?;

                let parent_hash = NodeHash::parent_hash(&left_hash, &right_hash);
                known.insert(parent_pos, parent_hash);
                next.push(parent_pos);

                i += if paired { 2 } else { 1 };
            }
            next.sort_unstable();
            next.dedup();
            current = next;
        }

        for pos in current {
            let hash = *known
                .get(&pos)
                .ok_or(AccumulatorError::VerifyFailed("root position missing after reconstruction"))?;
            roots.push((pos, hash));
        }

        // Targets that were already roots themselves (e.g. a single-leaf
        // tree) never entered the climb above; surface them too.
        for (&pos, &hash) in known.iter() {
            if state_is_root(state, pos) && !roots.iter().any(|(p, _)| *p == pos) {
                roots.push((pos, hash));
            }
        }

        Ok(roots)
    }
}

fn state_is_root(state: &ForestState, pos: u64) -> bool {
    let row = state.detect_row(pos);
    state.has_root(row) && state.root_position(row) == pos
}
