//! The public handle producers submit head changes through.

use crate::config::CoalescerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{CoalescerError, Result};
use crate::notifee::ReorgNotifee;
use crate::scheduler::{Scheduler, Submission};
use crate::stats::{CoalescerStats, StatsInner};
use async_trait::async_trait;
use chainhead_types::{HeadChange, TipSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// A stateful reorg notifee which coalesces incoming head changes with
/// pending ones, reducing the number of state computations downstream.
///
/// Cloning yields another handle to the same background task. The task
/// flushes and exits on [`close`](Self::close), or once every handle has
/// been dropped.
#[derive(Clone)]
pub struct HeadChangeCoalescer {
    config: CoalescerConfig,
    events: mpsc::Sender<Submission>,
    shutdown: CancellationToken,
    stopped: CancellationToken,
    stats: Arc<StatsInner>,
}

impl HeadChangeCoalescer {
    /// Creates a coalescer dispatching to `notifee` after `delay`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new<N>(notifee: N, delay: Duration) -> Self
    where
        N: ReorgNotifee + 'static,
    {
        Self::with_config(notifee, CoalescerConfig::new(delay))
    }

    /// Creates a coalescer from a configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn with_config<N>(notifee: N, config: CoalescerConfig) -> Self
    where
        N: ReorgNotifee + 'static,
    {
        // Capacity one plus the acceptance handshake: a producer is released
        // only once the scheduler has merged its head change.
        let (events, receiver) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let stopped = CancellationToken::new();
        let stats = Arc::new(StatsInner::default());

        let scheduler = Scheduler::new(
            config.delay,
            receiver,
            shutdown.clone(),
            Dispatcher::new(Arc::new(notifee), Arc::clone(&stats)),
            Arc::clone(&stats),
        );

        let guard = stopped.clone().drop_guard();
        tokio::spawn(async move {
            let _guard = guard;
            scheduler.run().await;
        });

        tracing::debug!(
            delay_ms = u64::try_from(config.delay.as_millis()).unwrap_or(u64::MAX),
            "head change coalescer started"
        );

        Self {
            config,
            events,
            shutdown,
            stopped,
            stats,
        }
    }

    /// Submits a head change for coalescing.
    ///
    /// Waits until the background task has merged the change. Fails with
    /// [`CoalescerError::Closed`] if the coalescer is closed first; the
    /// change was then not merged and will never be dispatched.
    pub async fn submit(&self, revert: Vec<Arc<TipSet>>, apply: Vec<Arc<TipSet>>) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(self.rejected());
        }

        let (accepted_tx, accepted) = oneshot::channel();
        let submission = Submission {
            change: HeadChange::new(revert, apply),
            accepted: accepted_tx,
        };

        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => return Err(self.rejected()),

            sent = self.events.send(submission) => {
                if sent.is_err() {
                    return Err(self.rejected());
                }
            }
        }

        // The scheduler either merges and acknowledges, or drops the
        // submission unmerged; the outcome reports which one happened.
        accepted.await.map_err(|_| self.rejected())
    }

    /// Closes the coalescer.
    ///
    /// Pending head changes are flushed to the notifee in the background;
    /// any further submission fails. Calling this more than once is a no-op.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("closing head change coalescer");
            self.shutdown.cancel();
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Waits until the background task has exited, after its final flush.
    ///
    /// Does not close the coalescer itself.
    pub async fn closed(&self) {
        self.stopped.cancelled().await;
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    /// Returns activity statistics.
    pub fn stats(&self) -> CoalescerStats {
        self.stats.snapshot()
    }

    fn rejected(&self) -> CoalescerError {
        StatsInner::incr(&self.stats.rejected, 1);
        CoalescerError::Closed
    }
}

impl std::fmt::Debug for HeadChangeCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadChangeCoalescer")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReorgNotifee for HeadChangeCoalescer {
    async fn head_change(
        &self,
        revert: &[Arc<TipSet>],
        apply: &[Arc<TipSet>],
    ) -> anyhow::Result<()> {
        self.submit(revert.to_vec(), apply.to_vec()).await?;
        Ok(())
    }
}

/// Wraps a notifee with a head change coalescer.
///
/// The returned coalescer is the notifee producers should call.
pub fn wrap_head_change_coalescer<N>(notifee: N, delay: Duration) -> HeadChangeCoalescer
where
    N: ReorgNotifee + 'static,
{
    HeadChangeCoalescer::new(notifee, delay)
}
