//! Walks a `RamForest`-backed accumulator through a batch of additions
//! followed by a batch of removals, printing the root hashes after each
//! step so the effect of a remove on tree shape is visible.

use rustreexo::accumulator::{Accumulator, Leaf, NodeHash};

fn leaf(tag: u8) -> NodeHash {
    let mut inner = [0u8; 32];
    inner[0] = tag;
    NodeHash::new(inner)
}

fn main() {
    let mut acc = Accumulator::new(rustreexo::accumulator::RamForest::new());

    let leaves: Vec<Leaf> = (1u8..=5).map(|b| Leaf::from(leaf(b))).collect();
    acc.add(&leaves).expect("add is infallible for fresh leaves");
    println!("after adding 5 leaves: {} roots", acc.roots().len());
    for root in acc.roots() {
        println!("  {root}");
    }

    acc.remove(&[1, 3]).expect("positions 1 and 3 are live");
    println!("\nafter removing positions 1 and 3: {} roots", acc.roots().len());
    for root in acc.roots() {
        println!("  {root}");
    }
}
