//! The background task that owns pending state.
//!
//! All mutation of [`PendingChanges`] happens here, so it needs no lock.
//! The quiescence timer is armed by the first head change of a burst and is
//! never pushed back by later ones: a burst is dispatched at most `delay`
//! after it started, however long it lasts.

use crate::coalesce::PendingChanges;
use crate::dispatch::Dispatcher;
use crate::stats::StatsInner;
use chainhead_types::HeadChange;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;

/// A head change handed over by a producer.
pub(crate) struct Submission {
    pub(crate) change: HeadChange,
    /// Resolved once the change has been merged.
    pub(crate) accepted: oneshot::Sender<()>,
}

pub(crate) struct Scheduler {
    delay: Duration,
    events: mpsc::Receiver<Submission>,
    shutdown: CancellationToken,
    dispatcher: Dispatcher,
    pending: PendingChanges,
    stats: Arc<StatsInner>,
}

impl Scheduler {
    pub(crate) fn new(
        delay: Duration,
        events: mpsc::Receiver<Submission>,
        shutdown: CancellationToken,
        dispatcher: Dispatcher,
        stats: Arc<StatsInner>,
    ) -> Self {
        Self {
            delay,
            events,
            shutdown,
            dispatcher,
            pending: PendingChanges::new(),
            stats,
        }
    }

    /// Runs until the coalescer is closed or every handle is dropped.
    pub(crate) async fn run(mut self) {
        let mut timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            // Shutdown first: nothing queued is merged once closed.
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                event = self.events.recv() => match event {
                    Some(submission) => {
                        self.coalesce(submission);
                        if timer.is_none() {
                            timer = Some(Box::pin(tokio::time::sleep(self.delay)));
                        }
                    }
                    None => break,
                },

                () = expired(&mut timer) => {
                    timer = None;
                    self.dispatcher.dispatch(&mut self.pending).await;
                }
            }
        }

        self.flush().await;
    }

    fn coalesce(&mut self, submission: Submission) {
        let Submission { change, accepted } = submission;
        let (revert, apply) = (change.revert.len(), change.apply.len());

        let outcome = self.pending.merge(change.revert, change.apply);

        StatsInner::incr(&self.stats.submitted, 1);
        StatsInner::incr(&self.stats.cancelled, outcome.cancelled as u64);
        tracing::debug!(
            revert,
            apply,
            cancelled = outcome.cancelled,
            pending_revert = self.pending.revert().len(),
            pending_apply = self.pending.apply().len(),
            "coalesced head change"
        );

        // The producer may have given up after a concurrent close.
        let _ = accepted.send(());
    }

    async fn flush(mut self) {
        // Refuse whatever is still queued before the final dispatch. Dropping
        // a submission drops its acknowledgement, so its producer sees Closed.
        self.events.close();
        let mut refused = 0usize;
        while let Ok(submission) = self.events.try_recv() {
            drop(submission);
            refused += 1;
        }
        if refused > 0 {
            tracing::debug!(refused, "refused queued head changes on shutdown");
        }

        if self.pending.is_empty() {
            tracing::info!("head change coalescer stopped");
            return;
        }

        tracing::info!(
            revert = self.pending.revert().len(),
            apply = self.pending.apply().len(),
            "head change coalescer stopping, flushing pending head change"
        );
        self.dispatcher.dispatch(&mut self.pending).await;
    }
}

/// Completes when the armed timer fires; never completes while disarmed.
async fn expired(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}
