//! The consumer side of the coalescer.

use async_trait::async_trait;
use chainhead_types::TipSet;
use std::sync::Arc;

/// Receives head changes: tipsets to revert, then tipsets to apply.
///
/// The coalescer calls its notifee from a single task, one batch at a time.
/// Errors are logged by the caller and never retried.
#[async_trait]
pub trait ReorgNotifee: Send + Sync {
    /// Handles one head change.
    async fn head_change(
        &self,
        revert: &[Arc<TipSet>],
        apply: &[Arc<TipSet>],
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> ReorgNotifee for F
where
    F: Fn(&[Arc<TipSet>], &[Arc<TipSet>]) -> anyhow::Result<()> + Send + Sync,
{
    async fn head_change(
        &self,
        revert: &[Arc<TipSet>],
        apply: &[Arc<TipSet>],
    ) -> anyhow::Result<()> {
        self(revert, apply)
    }
}

/// Pins a closure to the notifee signature so argument lifetimes infer.
pub fn notifee_fn<F>(f: F) -> F
where
    F: Fn(&[Arc<TipSet>], &[Arc<TipSet>]) -> anyhow::Result<()> + Send + Sync,
{
    f
}
