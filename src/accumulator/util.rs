//! Pure positional arithmetic over a forest of perfect binary trees packed
//! into a single flat coordinate space.
//!
//! [`ForestState`] carries no data beyond `num_leaves`; every other forest
//! fact (row count, root positions, the path from a root to a position) is a
//! pure function of it. The position scheme mirrors the one used by
//! `libutreexo`'s `state.h`/`state.cpp` (see `ram_forest.cpp`/`pollard.cpp`
//! for call sites): row 0 is the bottom (leaves), and a position's row is
//! found by walking down from a `1 << num_rows` marker bit.

/// Positional state of a forest: everything else is derived from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForestState {
    pub num_leaves: u64,
}

impl ForestState {
    pub fn new(num_leaves: u64) -> Self {
        ForestState { num_leaves }
    }

    /// `0` for an empty forest, else the smallest `r` with `2^r >= num_leaves`.
    pub fn num_rows(&self) -> u8 {
        if self.num_leaves == 0 {
            return 0;
        }
        let mut r = 0u8;
        while (1u64 << r) < self.num_leaves {
            r += 1;
        }
        r
    }

    pub fn num_roots(&self) -> u8 {
        self.num_leaves.count_ones() as u8
    }

    /// The total size of the packed coordinate space: `2^(num_rows+1)`.
    fn mask(&self) -> u64 {
        (2u64 << self.num_rows()).wrapping_sub(1)
    }

    /// Largest `r` such that position `pos` carries the row-`r` marker bit.
    pub fn detect_row(&self, pos: u64) -> u8 {
        let rows = self.num_rows();
        let mut marker = 1u64 << rows;
        let mut row = 0u8;
        while pos & marker != 0 {
            marker >>= 1;
            row += 1;
        }
        row
    }

    /// First position belonging to row `r`.
    pub fn row_offset(&self, row: u8) -> u64 {
        let rows = self.num_rows();
        (0..row).map(|i| 1u64 << (rows - i)).sum()
    }

    pub fn parent(&self, pos: u64) -> u64 {
        (pos >> 1) | (1u64 << self.num_rows())
    }

    /// `side` is `0` for the left child, `1` for the right child.
    pub fn child(&self, pos: u64, side: u8) -> u64 {
        ((pos << 1) & self.mask()) | (side as u64)
    }

    /// The opposite of a direction bit: `0 <-> 1`.
    pub fn sibling(lr: u8) -> u8 {
        1 - lr
    }

    /// The position paired with `pos` at the same row (`pos` XOR 1).
    ///
    /// Every row starts at an even offset (a sum of powers of two each
    /// `>= 2`), so a position's parity within the whole coordinate space
    /// always matches its parity within its row.
    fn sibling_position(&self, pos: u64) -> u64 {
        pos ^ 1
    }

    /// Position `drop` rows below `pos`, always taking the left child.
    pub fn left_descendant(&self, mut pos: u64, drop: u8) -> u64 {
        for _ in 0..drop {
            pos = self.child(pos, 0);
        }
        pos
    }

    pub fn has_root(&self, row: u8) -> bool {
        row <= 63 && (self.num_leaves >> row) & 1 == 1
    }

    /// Position of the root on row `r`, assuming [`Self::has_root`].
    pub fn root_position(&self, row: u8) -> u64 {
        self.root_position_for(self.num_leaves, row)
    }

    /// Where the root covering row `r` of a forest with `leaves` leaves
    /// would sit, expressed in *this* state's coordinate space (i.e. using
    /// this state's `num_rows`/`row_offset`, not `leaves`'s).
    ///
    /// This split is what lets [`Self::root_positions_for`] answer "where
    /// will the next state's roots live, read against data that hasn't been
    /// resized down to the next state's row lengths yet" — exactly the
    /// question `FinalizeRemove` (on either back-end) needs answered.
    fn root_position_for(&self, leaves: u64, row: u8) -> u64 {
        let leaves_before = leaves & !((1u64 << (row + 1)) - 1);
        self.row_offset(row) + (leaves_before >> row)
    }

    /// All root positions, tallest tree first.
    pub fn root_positions(&self) -> Vec<u64> {
        self.root_positions_for(self.num_leaves)
    }

    /// The positions, in *this* state's coordinate space, that will hold the
    /// roots once the forest is reduced to `next_num_leaves` leaves.
    pub fn root_positions_for(&self, next_num_leaves: u64) -> Vec<u64> {
        let mut positions = Vec::with_capacity(next_num_leaves.count_ones() as usize);
        let rows = self.num_rows();
        for row in (0..=rows).rev() {
            if (next_num_leaves >> row) & 1 == 1 {
                positions.push(self.root_position_for(next_num_leaves, row));
            }
        }
        positions
    }

    fn is_root_position(&self, pos: u64) -> bool {
        let row = self.detect_row(pos);
        self.has_root(row) && self.root_position(row) == pos
    }

    /// Locates `pos`: which root's subtree contains it (`0` = tallest),
    /// how deep it sits below that root, and, MSB-first, which side to
    /// descend at each step (`0` = left, `1` = right).
    pub fn path(&self, mut pos: u64) -> (u8, u8, u64) {
        let mut row = self.detect_row(pos);
        let mut side_bits: Vec<u64> = Vec::new();

        while !self.is_root_position(pos) {
            let local = pos - self.row_offset(row);
            side_bits.push(local & 1);
            pos = self.parent(pos);
            row += 1;
        }

        let higher_bits = self.num_leaves & !(1u64.checked_shl(row as u32 + 1).unwrap_or(0).wrapping_sub(1));
        let tree_index = higher_bits.count_ones() as u8;
        let length = side_bits.len() as u8;
        let mut bits = 0u64;
        for b in side_bits.iter().rev() {
            bits = (bits << 1) | b;
        }
        (tree_index, length, bits)
    }

    /// Splits a (sorted, deduplicated) batch of row-0 target positions into
    /// the sibling hashes a [`super::proof::BatchProof`] must carry
    /// (`proof`) and the positions the verifier reconstructs by applying
    /// `parent_hash` along the way (`computable`).
    ///
    /// Duplicate targets are folded out; inputs need not be pre-sorted.
    pub fn proof_positions(&self, targets: &[u64]) -> (Vec<u64>, Vec<u64>) {
        let mut proof = Vec::new();
        let mut computable = Vec::new();

        let mut current: Vec<u64> = targets.to_vec();
        current.sort_unstable();
        current.dedup();

        let rows = self.num_rows();
        for _ in 0..rows {
            let mut next = Vec::new();
            let mut i = 0;
            while i < current.len() {
                let pos = current[i];
                if self.is_root_position(pos) {
                    i += 1;
                    continue;
                }

                let sib = self.sibling_position(pos);
                if i + 1 < current.len() && current[i + 1] == sib {
                    next.push(self.parent(pos));
                    i += 2;
                } else {
                    proof.push(sib);
                    next.push(self.parent(pos));
                    i += 1;
                }
            }
            computable.extend(next.iter().copied());
            next.sort_unstable();
            next.dedup();
            current = next;
        }

        proof.sort_unstable();
        proof.dedup();
        (proof, computable)
    }
}

#[cfg(test)]
mod tests {
    use super::ForestState;

    #[test]
    fn num_rows_and_roots() {
        assert_eq!(ForestState::new(0).num_rows(), 0);
        assert_eq!(ForestState::new(1).num_rows(), 0);
        assert_eq!(ForestState::new(2).num_rows(), 1);
        assert_eq!(ForestState::new(3).num_rows(), 2);
        assert_eq!(ForestState::new(4).num_rows(), 2);

        assert_eq!(ForestState::new(3).num_roots(), 2);
        assert_eq!(ForestState::new(7).num_roots(), 3);
    }

    #[test]
    fn root_positions_three_leaves() {
        // 3 = 0b11: a row-1 root (paired leaves 0,1) then a row-0 root (leaf 2).
        let state = ForestState::new(3);
        assert_eq!(state.root_positions(), vec![4, 2]);
    }

    #[test]
    fn root_positions_seven_leaves() {
        let state = ForestState::new(7);
        // row2 root covers leaves[0,4), row1 covers [4,6), row0 is leaf 6.
        assert_eq!(state.root_positions(), vec![state.root_position(2), state.root_position(1), state.root_position(0)]);
        assert_eq!(state.num_roots() as usize, state.root_positions().len());
    }

    #[test]
    fn detect_row_matches_row_offset_ranges() {
        let state = ForestState::new(7);
        for row in 0..=state.num_rows() {
            let start = state.row_offset(row);
            assert_eq!(state.detect_row(start), row);
        }
    }

    #[test]
    fn path_round_trips() {
        let state = ForestState::new(7);
        for pos in 0..7u64 {
            let (tree, len, bits) = state.path(pos);
            let root = state.root_positions()[tree as usize];
            let mut cur = root;
            for i in 0..len {
                let side = (bits >> (len - 1 - i)) & 1;
                cur = state.child(cur, side as u8);
            }
            assert_eq!(cur, pos);
        }
    }

    #[test]
    fn proof_positions_excludes_targets() {
        let state = ForestState::new(8);
        let targets = vec![0u64, 2, 5];
        let (proof, _computable) = state.proof_positions(&targets);
        for p in &proof {
            assert!(!targets.contains(p));
        }
    }

    #[test]
    fn proof_positions_paired_targets_need_no_proof() {
        // Leaves 0 and 1 are siblings: proving both needs no extra hash for
        // their own pair, only whatever is needed to climb past their parent.
        let state = ForestState::new(4);
        let (proof, _) = state.proof_positions(&[0, 1]);
        // Parent of (0,1) is a root's sibling at the next row up.
        assert!(!proof.contains(&0));
        assert!(!proof.contains(&1));
    }
}
