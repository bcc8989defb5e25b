//! Common types used throughout `chainhead`.
//!
//! A [`TipSet`] is the set of blocks produced at one height of the chain, and
//! is identified by its [`TipSetKey`]. A [`HeadChange`] is a single reorg
//! notification: the tipsets leaving the canonical chain and the tipsets
//! joining it, in the order they were reverted and applied.

mod block;
mod tipset;

pub use block::BlockId;
pub use tipset::{HeadChange, TipSet, TipSetKey};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_head_change_from_tipsets() {
        let genesis = TipSet::new(0, vec![BlockId::digest(b"genesis")], TipSetKey::default());
        let child = TipSet::new(1, vec![BlockId::digest(b"child")], genesis.key().clone());

        let change = HeadChange::new(vec![Arc::new(genesis)], vec![Arc::new(child)]);
        assert_eq!(change.len(), 2);
        assert!(!change.is_empty());
    }
}
