//! Revert/apply coalescing.
//!
//! Incoming head changes are folded into the pending (not yet dispatched)
//! state. A tipset that is reverted after being applied, or applied after
//! being reverted, cancels out:
//!
//! - pending reverts are cancelled by incoming applies
//! - incoming reverts are cancelled by pending applies
//! - pending applies are cancelled by incoming reverts
//! - incoming applies are cancelled by pending reverts
//!
//! Survivors keep their relative order, pending entries before incoming ones.
//! Duplicates within a single sequence are kept as-is.

use chainhead_types::{HeadChange, TipSet, TipSetKey};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a single merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries dropped from the pending and incoming sequences.
    pub cancelled: usize,
}

/// Net head change accumulated since the last dispatch.
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    revert: Vec<Arc<TipSet>>,
    apply: Vec<Arc<TipSet>>,
}

impl PendingChanges {
    /// Creates an empty pending state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending reverts.
    pub fn revert(&self) -> &[Arc<TipSet>] {
        &self.revert
    }

    /// Pending applies.
    pub fn apply(&self) -> &[Arc<TipSet>] {
        &self.apply
    }

    /// Returns true if there is nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.revert.is_empty() && self.apply.is_empty()
    }

    /// Takes the pending state, leaving it empty.
    pub fn take(&mut self) -> HeadChange {
        HeadChange::new(
            std::mem::take(&mut self.revert),
            std::mem::take(&mut self.apply),
        )
    }

    /// Merges an incoming head change into the pending state.
    pub fn merge(&mut self, revert: Vec<Arc<TipSet>>, apply: Vec<Arc<TipSet>>) -> MergeOutcome {
        let pending_revert = key_set(&self.revert);
        let pending_apply = key_set(&self.apply);
        let reverting = key_set(&revert);
        let applying = key_set(&apply);

        let before = self.revert.len() + self.apply.len() + revert.len() + apply.len();

        let mut new_revert = Vec::with_capacity(self.revert.len() + revert.len());
        new_revert.extend(surviving(&self.revert, &applying));
        new_revert.extend(surviving(&revert, &pending_apply));

        let mut new_apply = Vec::with_capacity(self.apply.len() + apply.len());
        new_apply.extend(surviving(&self.apply, &reverting));
        new_apply.extend(surviving(&apply, &pending_revert));

        self.revert = new_revert;
        self.apply = new_apply;

        MergeOutcome {
            cancelled: before - (self.revert.len() + self.apply.len()),
        }
    }
}

fn key_set(tipsets: &[Arc<TipSet>]) -> HashSet<&TipSetKey> {
    tipsets.iter().map(|ts| ts.key()).collect()
}

fn surviving<'a>(
    tipsets: &'a [Arc<TipSet>],
    cancel: &'a HashSet<&'a TipSetKey>,
) -> impl Iterator<Item = Arc<TipSet>> + 'a {
    tipsets
        .iter()
        .filter(move |ts| !cancel.contains(ts.key()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainhead_types::BlockId;
    use proptest::prelude::*;

    fn ts(n: u64) -> Arc<TipSet> {
        Arc::new(TipSet::new(
            n,
            vec![BlockId::digest(n.to_be_bytes())],
            TipSetKey::default(),
        ))
    }

    fn heights(tipsets: &[Arc<TipSet>]) -> Vec<u64> {
        tipsets.iter().map(|t| t.height()).collect()
    }

    #[test]
    fn test_revert_cancels_pending_apply() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![], vec![ts(1)]);

        let outcome = pending.merge(vec![ts(1)], vec![]);

        assert!(pending.is_empty());
        assert_eq!(outcome.cancelled, 2);
    }

    #[test]
    fn test_apply_cancels_pending_revert() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(5)], vec![]);

        pending.merge(vec![], vec![ts(5), ts(6)]);

        assert!(pending.revert().is_empty());
        assert_eq!(heights(pending.apply()), vec![6]);
    }

    #[test]
    fn test_unrelated_keys_accumulate() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(2)], vec![]);

        let outcome = pending.merge(vec![], vec![ts(3)]);

        assert_eq!(heights(pending.revert()), vec![2]);
        assert_eq!(heights(pending.apply()), vec![3]);
        assert_eq!(outcome.cancelled, 0);
    }

    #[test]
    fn test_order_pending_before_incoming() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(9), ts(8)], vec![ts(10), ts(11)]);

        pending.merge(vec![ts(7), ts(11)], vec![ts(12), ts(8)]);

        // 8 is re-applied and 11 is reverted: both cancel across the boundary.
        assert_eq!(heights(pending.revert()), vec![9, 7]);
        assert_eq!(heights(pending.apply()), vec![10, 12]);
    }

    #[test]
    fn test_chained_reorg() {
        // head 1 -> 2, then reorg 2 -> 2', then 2' -> 3'
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(1)], vec![ts(2)]);
        pending.merge(vec![ts(2)], vec![ts(20)]);
        pending.merge(vec![ts(20)], vec![ts(30)]);

        assert_eq!(heights(pending.revert()), vec![1]);
        assert_eq!(heights(pending.apply()), vec![30]);
    }

    #[test]
    fn test_duplicates_within_batch_are_kept() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![], vec![ts(4), ts(4)]);

        assert_eq!(heights(pending.apply()), vec![4, 4]);
    }

    #[test]
    fn test_same_batch_revert_and_apply_do_not_cancel() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(4)], vec![ts(4)]);

        assert_eq!(heights(pending.revert()), vec![4]);
        assert_eq!(heights(pending.apply()), vec![4]);
    }

    #[test]
    fn test_take_clears() {
        let mut pending = PendingChanges::new();
        pending.merge(vec![ts(1)], vec![ts(2)]);

        let change = pending.take();

        assert_eq!(change.len(), 2);
        assert!(pending.is_empty());
    }

    fn arb_change() -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
        // Distinct keys within each sequence, revert and apply disjoint.
        proptest::collection::btree_set(0u64..24, 0..12).prop_flat_map(|keys| {
            let keys: Vec<u64> = keys.into_iter().collect();
            let len = keys.len();
            (Just(keys), 0..=len).prop_map(|(keys, split)| {
                let (revert, apply) = keys.split_at(split);
                (revert.to_vec(), apply.to_vec())
            })
        })
    }

    proptest! {
        #[test]
        fn prop_no_key_in_both_sequences(changes in proptest::collection::vec(arb_change(), 1..16)) {
            let mut pending = PendingChanges::new();
            for (revert, apply) in changes {
                pending.merge(
                    revert.into_iter().map(ts).collect(),
                    apply.into_iter().map(ts).collect(),
                );

                let reverted: HashSet<_> = pending.revert().iter().map(|t| t.key().clone()).collect();
                for t in pending.apply() {
                    prop_assert!(!reverted.contains(t.key()));
                }
            }
        }

        #[test]
        fn prop_merge_into_empty_is_identity((revert, apply) in arb_change()) {
            let mut pending = PendingChanges::new();
            let outcome = pending.merge(
                revert.iter().copied().map(ts).collect(),
                apply.iter().copied().map(ts).collect(),
            );

            prop_assert_eq!(outcome.cancelled, 0);
            prop_assert_eq!(heights(pending.revert()), revert);
            prop_assert_eq!(heights(pending.apply()), apply);
        }
    }
}
