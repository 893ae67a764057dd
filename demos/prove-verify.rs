//! Builds a batch proof of membership for a subset of leaves and verifies
//! it, then shows what happens when the proof is tampered with.

use rustreexo::accumulator::{Accumulator, Leaf, NodeHash, RamForest};

fn leaf(tag: u8) -> NodeHash {
    let mut inner = [0u8; 32];
    inner[0] = tag;
    NodeHash::new(inner)
}

fn main() {
    let mut acc = Accumulator::new(RamForest::new());
    let leaves: Vec<Leaf> = (1u8..=7).map(|b| Leaf::from(leaf(b))).collect();
    acc.add(&leaves).unwrap();

    let targets = [leaf(2), leaf(5)];
    let proof = acc.prove(&targets).expect("both leaves are live");
    println!("proof carries {} sibling hashes for {} targets", proof.hashes.len(), proof.targets.len());

    let ok = acc.verify(&proof, &targets).unwrap();
    println!("verify against the real leaves: {ok}");

    let tampered = [leaf(2), leaf(99)];
    let ok = acc.verify(&proof, &tampered).unwrap();
    println!("verify against a tampered leaf: {ok}");
}
