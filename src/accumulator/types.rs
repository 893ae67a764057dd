//! Shared value types: leaves and the crate's error enum.

use thiserror::Error;

use super::node_hash::NodeHash;

/// A single element being added to the forest.
///
/// `remember` only matters to the [`super::pollard::Pollard`] back-end: it
/// asks that the leaf, and the sibling hashes along its path, be retained so
/// that this leaf can be proven against later. The full forest remembers
/// everything regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leaf {
    pub hash: NodeHash,
    pub remember: bool,
}

impl Leaf {
    pub fn new(hash: NodeHash, remember: bool) -> Self {
        Leaf { hash, remember }
    }
}

impl From<NodeHash> for Leaf {
    fn from(hash: NodeHash) -> Self {
        Leaf::new(hash, false)
    }
}

/// Everything that can go wrong inside the accumulator.
///
/// `add`/`remove` are all-or-nothing: whenever one of these is returned the
/// accumulator's visible state is exactly what it was before the call.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum AccumulatorError {
    #[error("position {0} exceeds the forest's packed range")]
    PositionOutOfRange(u64),

    #[error("hash is not a known target of this forest")]
    UnknownTarget,

    #[error("required niece at position {0} has been pruned")]
    Pruned(u64),

    #[error("verification failed: {0}")]
    VerifyFailed(&'static str),

    #[error("accumulator invariant violated: {0}")]
    InvariantViolation(&'static str),
}

pub type Result<T> = std::result::Result<T, AccumulatorError>;
