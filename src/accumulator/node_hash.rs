//! 32-byte digest type used throughout the accumulator, and the
//! `parent_hash` combinator that the rest of the crate builds on.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use bitcoin_hashes::hex::FromHex;
use bitcoin_hashes::{sha256, Hash as BitcoinHash, HashEngine};

/// A node's hash, or the sentinel "no data here" empty hash.
///
/// `Empty` is distinct from "all zero bytes happen to be the real hash" only
/// in the sense that `parent_hash` treats it specially; callers that need a
/// real, comparable 32-byte value should go through [`NodeHash::as_bytes`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeHash {
    inner: [u8; 32],
    empty: bool,
}

impl Default for NodeHash {
    fn default() -> Self {
        NodeHash::empty()
    }
}

impl NodeHash {
    /// Wraps a 32-byte digest.
    pub fn new(inner: [u8; 32]) -> Self {
        NodeHash {
            inner,
            empty: false,
        }
    }

    /// The sentinel hash signaling "this position has no data".
    pub const fn empty() -> Self {
        NodeHash {
            inner: [0; 32],
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.inner
    }

    /// The Merkle parent of two child hashes.
    ///
    /// If both children are empty, the parent is empty too: a sparse forest
    /// must not propagate a spurious hash upward from an all-empty subtree.
    pub fn parent_hash(left: &NodeHash, right: &NodeHash) -> NodeHash {
        if left.empty && right.empty {
            return NodeHash::empty();
        }

        let mut engine = sha256::Hash::engine();
        engine.input(left.as_bytes());
        engine.input(right.as_bytes());
        NodeHash::new(sha256::Hash::from_engine(engine).to_byte_array())
    }
}

impl From<[u8; 32]> for NodeHash {
    fn from(inner: [u8; 32]) -> Self {
        NodeHash::new(inner)
    }
}

impl From<sha256::Hash> for NodeHash {
    fn from(hash: sha256::Hash) -> Self {
        NodeHash::new(hash.to_byte_array())
    }
}

impl From<&[u8]> for NodeHash {
    fn from(hash: &[u8]) -> Self {
        let mut inner = [0u8; 32];
        inner.copy_from_slice(hash);
        NodeHash::new(inner)
    }
}

impl FromStr for NodeHash {
    type Err = bitcoin_hashes::hex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().all(|c| c == '0') && s.len() == 64 {
            return Ok(NodeHash::empty());
        }
        let inner: [u8; 32] = FromHex::from_hex(s)?;
        Ok(NodeHash::new(inner))
    }
}

impl Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            return write!(f, "empty");
        }
        for byte in self.inner.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHash({})", self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::NodeHash;

    fn leaf(byte: u8) -> NodeHash {
        let mut inner = [0u8; 32];
        inner[0] = byte;
        NodeHash::new(inner)
    }

    #[test]
    fn empty_pair_stays_empty() {
        let parent = NodeHash::parent_hash(&NodeHash::empty(), &NodeHash::empty());
        assert!(parent.is_empty());
    }

    #[test]
    fn non_empty_pair_hashes() {
        let parent = NodeHash::parent_hash(&leaf(1), &leaf(2));
        assert!(!parent.is_empty());
        // deterministic: same inputs, same output
        assert_eq!(parent, NodeHash::parent_hash(&leaf(1), &leaf(2)));
        assert_ne!(parent, NodeHash::parent_hash(&leaf(2), &leaf(1)));
    }

    #[test]
    fn roundtrips_through_hex() {
        let h = leaf(7);
        let s = h.to_string();
        let parsed = NodeHash::from_str(&s).unwrap();
        assert_eq!(h, parsed);
    }
}
