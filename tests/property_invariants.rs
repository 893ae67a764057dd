//! Property-based tests for the cross-cutting invariants an accumulator
//! must hold no matter what sequence of adds/removes produced its state:
//! root count tracks `popcount(num_leaves)`, and the two back-ends never
//! disagree on root hashes when driven through the same operations.

use proptest::prelude::*;
use rustreexo::accumulator::{Accumulator, Leaf, NodeHash, Pollard, RamForest};

fn leaf_hash(tag: u64) -> NodeHash {
    let mut inner = [0u8; 32];
    inner[..8].copy_from_slice(&tag.to_le_bytes());
    NodeHash::new(inner)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// `count(roots) == popcount(num_leaves)` after every add/remove.
    #[test]
    fn root_count_matches_popcount(counts in prop::collection::vec(1u8..=5, 1..6)) {
        let mut acc = Accumulator::new(RamForest::new());
        let mut tag = 0u64;
        for count in counts {
            let leaves: Vec<Leaf> = (0..count)
                .map(|_| { tag += 1; Leaf::from(leaf_hash(tag)) })
                .collect();
            acc.add(&leaves).unwrap();
            prop_assert_eq!(acc.roots().len() as u32, acc.num_leaves().count_ones());
        }
    }

    /// `RamForest` and `Pollard`, driven through an identical add/remove
    /// plan with every leaf remembered, must always agree on root hashes.
    #[test]
    fn ram_forest_and_pollard_agree(batches in prop::collection::vec(1u8..=6, 1..5)) {
        let mut full = Accumulator::new(RamForest::new());
        let mut pruned = Accumulator::new(Pollard::new());
        let mut tag = 0u64;

        for count in batches {
            let leaves: Vec<Leaf> = (0..count)
                .map(|_| { tag += 1; Leaf::new(leaf_hash(tag), true) })
                .collect();
            full.add(&leaves).unwrap();
            pruned.add(&leaves).unwrap();
            prop_assert_eq!(full.roots(), pruned.roots());
            prop_assert_eq!(full.num_leaves(), pruned.num_leaves());

            if full.num_leaves() > 1 {
                full.remove(&[0]).unwrap();
                pruned.remove(&[0]).unwrap();
                prop_assert_eq!(full.roots(), pruned.roots());
                prop_assert_eq!(full.num_leaves(), pruned.num_leaves());
            }
        }
    }

    /// A proof built by the full forest always verifies against its own
    /// current roots, for any subset of currently-live leaves.
    #[test]
    fn prove_then_verify_round_trips(count in 1u8..16, pick_mod in 1u64..5) {
        let mut acc = Accumulator::new(RamForest::new());
        let leaves: Vec<Leaf> = (1..=count).map(|b| Leaf::from(leaf_hash(b as u64))).collect();
        acc.add(&leaves).unwrap();

        let targets: Vec<NodeHash> = (1..=count)
            .filter(|b| *b as u64 % pick_mod == 0)
            .map(|b| leaf_hash(b as u64))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let proof = acc.prove(&targets).unwrap();
        prop_assert!(acc.verify(&proof, &targets).unwrap());
    }
}
