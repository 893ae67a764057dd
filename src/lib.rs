//! A Rust implementation of Utreexo: a hash-based accumulator that commits
//! to a set of elements (UTXOs, in the accumulator's original application)
//! as a forest of perfect binary Merkle trees, so that membership can be
//! proven and elements removed while keeping O(log n) persistent state.
//!
//! The accumulator logic lives in [`accumulator`]; start with
//! [`accumulator::Accumulator`].

pub mod accumulator;
