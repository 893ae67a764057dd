//! [`RamForest`]: the full-forest back-end. Stores every hash, row-major,
//! plus a hash-to-position index over row 0 — the prover's back-end.
//!
//! Grounded in `ram_forest.cpp` (`Read`, `SwapRange`, `SwapSubTrees`,
//! `MergeRoot`, `NewLeaf`, `FinalizeRemove`, `Prove`): this module keeps the
//! same row-major storage and position map, expressed as a single owning
//! struct rather than a node-pool of `NodePtr<Node>` cursors — Rust's
//! ownership model makes the pool unnecessary since nothing here needs to
//! outlive a `&mut RamForest` borrow.

use std::collections::HashMap;

use super::node_hash::NodeHash;
use super::proof::BatchProof;
use super::types::{AccumulatorError, Leaf, Result};
use super::util::ForestState;
use super::Forest;

/// Full-forest back-end. `data[r][i]` is the hash at row `r`, offset `i`;
/// `posmap` resolves a row-0 hash back to its position.
#[derive(Debug, Clone, Default)]
pub struct RamForest {
    state: ForestState,
    data: Vec<Vec<NodeHash>>,
    posmap: HashMap<NodeHash, u64>,
}

impl RamForest {
    pub fn new() -> Self {
        RamForest::default()
    }

    fn row_mut(&mut self, row: u8) -> &mut Vec<NodeHash> {
        while self.data.len() <= row as usize {
            self.data.push(Vec::new());
        }
        &mut self.data[row as usize]
    }

    /// Reads the hash stored at `pos`, failing if the position is outside
    /// the forest's current packed range or its row hasn't been allocated.
    pub(crate) fn read(&self, pos: u64) -> Result<NodeHash> {
        let row = self.state.detect_row(pos);
        let offset = self.state.row_offset(row);
        let idx = (pos - offset) as usize;

        let row_data = self
            .data
            .get(row as usize)
            .ok_or(AccumulatorError::PositionOutOfRange(pos))?;
        row_data
            .get(idx)
            .copied()
            .ok_or(AccumulatorError::PositionOutOfRange(pos))
    }

    fn write(&mut self, pos: u64, hash: NodeHash) {
        let row = self.state.detect_row(pos);
        let offset = self.state.row_offset(row);
        let idx = (pos - offset) as usize;
        let row_data = self.row_mut(row);
        if row_data.len() <= idx {
            row_data.resize(idx + 1, NodeHash::empty());
        }
        row_data[idx] = hash;
    }

    /// Swaps `range` contiguous hashes, row-locally, between `from` and
    /// `to`. Mirrors `ram_forest.cpp::SwapRange`.
    fn swap_range(&mut self, from: u64, to: u64, range: u64) {
        let row = self.state.detect_row(from);
        let offset_from = self.state.row_offset(row);
        let offset_to = self.state.row_offset(row);
        let base_from = (from - offset_from) as usize;
        let base_to = (to - offset_to) as usize;

        for i in 0..range as usize {
            let a = self.read_idx(row, base_from + i);
            let b = self.read_idx(row, base_to + i);
            self.write_idx(row, base_from + i, b);
            self.write_idx(row, base_to + i, a);

            if row == 0 {
                if !b.is_empty() {
                    self.posmap.insert(b, from + i as u64);
                }
                if !a.is_empty() {
                    self.posmap.insert(a, to + i as u64);
                }
            }
        }
    }

    fn read_idx(&self, row: u8, idx: usize) -> NodeHash {
        self.data
            .get(row as usize)
            .and_then(|r| r.get(idx))
            .copied()
            .unwrap_or_else(NodeHash::empty)
    }

    fn write_idx(&mut self, row: u8, idx: usize, hash: NodeHash) {
        let row_data = self.row_mut(row);
        if row_data.len() <= idx {
            row_data.resize(idx + 1, NodeHash::empty());
        }
        row_data[idx] = hash;
    }

    /// Resolves target hashes to positions and reads off the sibling hashes
    /// `ForestState::proof_positions` says a verifier will need. Mirrors
    /// `ram_forest.cpp::Prove`.
    ///
    /// `targets` in the returned proof stays in `target_hashes`'s order
    /// (not sorted by position): [`BatchProof::compute_roots`] zips it
    /// against whatever `target_hashes` a verifier supplies later, and a
    /// verifier has no way to know the position order ahead of time.
    pub fn prove(&self, target_hashes: &[NodeHash]) -> Result<BatchProof> {
        let mut targets = Vec::with_capacity(target_hashes.len());
        for hash in target_hashes {
            let pos = *self
                .posmap
                .get(hash)
                .ok_or(AccumulatorError::UnknownTarget)?;
            targets.push(pos);
        }

        let (proof_positions, _computable) = self.state.proof_positions(&targets);
        let mut hashes = Vec::with_capacity(proof_positions.len());
        for pos in &proof_positions {
            hashes.push(self.read(*pos)?);
        }

        Ok(BatchProof::new(targets, hashes))
    }
}

impl Forest for RamForest {
    fn state(&self) -> ForestState {
        self.state
    }

    /// Pre-sizes every row for the leaf count the forest will have after
    /// `additional` more adds. Mirrors `ram_forest.cpp::Add`'s `reserve`
    /// pass over `m_data` before it delegates to the per-leaf loop.
    fn reserve(&mut self, additional: u64) {
        let next_state = ForestState::new(self.state.num_leaves + additional);
        let rows = next_state.num_rows();
        let mut leaves = next_state.num_leaves;
        for row in 0..=rows {
            let row_data = self.row_mut(row);
            let target = leaves as usize;
            let additional = target.saturating_sub(row_data.len());
            row_data.reserve(additional);
            leaves >>= 1;
        }
    }

    fn add_leaf(&mut self, leaf: Leaf) -> Result<()> {
        let leaves_before = self.state.num_leaves;
        // Bump num_leaves first: detect_row(leaves_before) only resolves to
        // row 0 once num_rows() accounts for this leaf (it can grow by one
        // on this very insert, e.g. 2 -> 3 leaves raises H from 1 to 2).
        self.state.num_leaves = leaves_before + 1;

        // New leaf becomes the newest row-0 entry and, for now, its own root.
        self.write(leaves_before, leaf.hash);
        self.posmap.insert(leaf.hash, leaves_before);

        // Merge while the previous root at this height is occupied, exactly
        // the popcount walk `ram_forest.cpp::NewLeaf`'s caller performs.
        let mut h = 0u8;
        while (leaves_before >> h) & 1 == 1 {
            let parent_pos = self.state.root_position(h + 1);
            let left_pos = self.state.child(parent_pos, 0);
            let right_pos = self.state.child(parent_pos, 1);
            let left_hash = self.read(left_pos)?;
            let right_hash = self.read(right_pos)?;
            let parent_hash = NodeHash::parent_hash(&left_hash, &right_hash);
            self.write(parent_pos, parent_hash);
            h += 1;
        }

        Ok(())
    }

    fn swap_sub_trees(&mut self, from: u64, to: u64) -> Result<Vec<u64>> {
        let row = self.state.detect_row(from);
        let mut from = self.state.left_descendant(from, row);
        let mut to = self.state.left_descendant(to, row);

        let mut range = 1u64 << row;
        loop {
            self.swap_range(from, to, range);
            from = self.state.parent(from);
            to = self.state.parent(to);
            if range == 1 {
                break;
            }
            range >>= 1;
        }

        Ok(vec![to])
    }

    fn rehash(&mut self, pos: u64) -> Result<()> {
        let left_pos = self.state.child(pos, 0);
        let right_pos = self.state.child(pos, 1);
        let left_hash = self.read(left_pos)?;
        let right_hash = self.read(right_pos)?;
        let parent_hash = NodeHash::parent_hash(&left_hash, &right_hash);
        self.write(pos, parent_hash);
        Ok(())
    }

    fn finalize_remove(&mut self, next_state: ForestState) -> Result<()> {
        if next_state.num_leaves > self.state.num_leaves {
            return Err(AccumulatorError::InvariantViolation(
                "finalize_remove must shrink num_leaves",
            ));
        }

        for pos in next_state.num_leaves..self.state.num_leaves {
            if let Ok(hash) = self.read(pos) {
                self.posmap.remove(&hash);
            }
        }

        let rows = self.state.num_rows();
        let mut leaves = next_state.num_leaves;
        for row in 0..rows {
            if let Some(row_data) = self.data.get_mut(row as usize) {
                row_data.truncate(leaves as usize);
            }
            leaves >>= 1;
        }

        self.state.num_leaves = next_state.num_leaves;
        debug_assert_eq!(self.posmap.len() as u64, self.state.num_leaves);
        Ok(())
    }

    fn roots(&self) -> Vec<NodeHash> {
        self.state
            .root_positions()
            .into_iter()
            .map(|pos| self.read(pos).expect("root position must be populated"))
            .collect()
    }
}
