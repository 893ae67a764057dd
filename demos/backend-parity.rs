//! Drives a `RamForest` and a `Pollard` through the same add/remove
//! sequence and confirms their root hashes never diverge, demonstrating
//! that a verifier running the pruned back-end can trust a prover running
//! the full one.

use rustreexo::accumulator::{Accumulator, Leaf, NodeHash, Pollard, RamForest};

fn leaf(tag: u8) -> NodeHash {
    let mut inner = [0u8; 32];
    inner[0] = tag;
    NodeHash::new(inner)
}

fn main() {
    let mut full = Accumulator::new(RamForest::new());
    let mut pruned = Accumulator::new(Pollard::new());

    let leaves: Vec<Leaf> = (1u8..=8).map(|b| Leaf::new(leaf(b), true)).collect();
    full.add(&leaves).unwrap();
    pruned.add(&leaves).unwrap();
    assert_eq!(full.roots(), pruned.roots());
    println!("after 8 adds, both back-ends agree on {} roots", full.roots().len());

    full.remove(&[0, 3, 6]).unwrap();
    pruned.remove(&[0, 3, 6]).unwrap();
    assert_eq!(full.roots(), pruned.roots());
    println!("after removing 3 leaves, both back-ends agree on {} roots", full.roots().len());
}
