//! Tipsets and head change notifications.

use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies a tipset by the ordered set of blocks it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TipSetKey(Vec<BlockId>);

impl TipSetKey {
    /// Creates a key from block identifiers.
    pub fn new(blocks: Vec<BlockId>) -> Self {
        Self(blocks)
    }

    /// Returns the block identifiers.
    pub fn blocks(&self) -> &[BlockId] {
        &self.0
    }

    /// Returns true if the key names no blocks (the genesis parent key).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<BlockId>> for TipSetKey {
    fn from(blocks: Vec<BlockId>) -> Self {
        Self(blocks)
    }
}

impl std::fmt::Display for TipSetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, block) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", block.short())?;
        }
        write!(f, "}}")
    }
}

/// A tipset: all blocks at a given height sharing the same parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipSet {
    key: TipSetKey,
    height: u64,
    parents: TipSetKey,
}

impl TipSet {
    /// Creates a tipset from its blocks.
    pub fn new(height: u64, blocks: Vec<BlockId>, parents: TipSetKey) -> Self {
        Self {
            key: TipSetKey::new(blocks),
            height,
            parents,
        }
    }

    /// Returns the tipset key.
    pub fn key(&self) -> &TipSetKey {
        &self.key
    }

    /// Returns the chain height.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Returns the key of the parent tipset.
    pub fn parents(&self) -> &TipSetKey {
        &self.parents
    }
}

/// A single head change: tipsets to revert, then tipsets to apply.
#[derive(Debug, Clone, Default)]
pub struct HeadChange {
    /// Tipsets leaving the canonical chain.
    pub revert: Vec<Arc<TipSet>>,
    /// Tipsets joining the canonical chain.
    pub apply: Vec<Arc<TipSet>>,
}

impl HeadChange {
    /// Creates a head change.
    pub fn new(revert: Vec<Arc<TipSet>>, apply: Vec<Arc<TipSet>>) -> Self {
        Self { revert, apply }
    }

    /// Returns true if nothing is reverted or applied.
    pub fn is_empty(&self) -> bool {
        self.revert.is_empty() && self.apply.is_empty()
    }

    /// Total number of tipsets carried.
    pub fn len(&self) -> usize {
        self.revert.len() + self.apply.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tipset(height: u64, seed: &str) -> TipSet {
        TipSet::new(height, vec![BlockId::digest(seed)], TipSetKey::default())
    }

    #[test]
    fn test_key_identity() {
        let a = tipset(1, "a");
        let b = tipset(1, "a");
        let c = tipset(1, "c");

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(a.height(), 1);
        assert!(a.parents().is_empty());
    }

    #[test]
    fn test_key_display() {
        let key = TipSetKey::new(vec![
            BlockId::from_bytes([0xab; 32]),
            BlockId::from_bytes([0x01; 32]),
        ]);
        assert_eq!(key.to_string(), "{abababab,01010101}");
        assert_eq!(TipSetKey::default().to_string(), "{}");
    }

    #[test]
    fn test_tipset_serialization() {
        let ts = tipset(7, "seven");
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: TipSet = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }

    #[test]
    fn test_empty_head_change() {
        let change = HeadChange::default();
        assert!(change.is_empty());
        assert_eq!(change.len(), 0);
    }
}
