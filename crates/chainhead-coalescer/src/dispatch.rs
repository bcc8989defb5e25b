//! Hands coalesced batches to the notifee.

use crate::coalesce::PendingChanges;
use crate::notifee::ReorgNotifee;
use crate::stats::StatsInner;
use chainhead_types::HeadChange;
use std::sync::Arc;

pub(crate) struct Dispatcher {
    notifee: Arc<dyn ReorgNotifee>,
    stats: Arc<StatsInner>,
}

impl Dispatcher {
    pub(crate) fn new(notifee: Arc<dyn ReorgNotifee>, stats: Arc<StatsInner>) -> Self {
        Self { notifee, stats }
    }

    /// Delivers the pending state once and clears it, whatever the outcome.
    pub(crate) async fn dispatch(&self, pending: &mut PendingChanges) {
        let HeadChange { revert, apply } = pending.take();
        StatsInner::incr(&self.stats.dispatched, 1);

        match self.notifee.head_change(&revert, &apply).await {
            Ok(()) => {
                tracing::debug!(
                    revert = revert.len(),
                    apply = apply.len(),
                    "dispatched coalesced head change"
                );
            }
            Err(e) => {
                StatsInner::incr(&self.stats.dispatch_failures, 1);
                tracing::error!(
                    error = %e,
                    revert = revert.len(),
                    apply = apply.len(),
                    "error dispatching coalesced head change notification"
                );
            }
        }
    }
}
