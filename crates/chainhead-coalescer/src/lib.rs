//! # Chainhead Coalescer
//!
//! Absorbs bursts of chain head changes and hands their net effect to a
//! single downstream notifee after a quiescence window.
//!
//! Every head change a notifee receives can trigger an expensive state
//! computation. During a reorg race the chain may announce several head
//! changes within milliseconds, most of which undo each other. The
//! [`HeadChangeCoalescer`] folds them together and dispatches once.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐ submit ┌──────────────────┐ merge ┌──────────────────┐
//! │  Producer  │───────▶│ HeadChangeCoal.  │──────▶│ Scheduler task   │
//! │ (chain     │        │ (handle, Clone)  │ chan  │ owns pending     │
//! │  store)    │◀───────│                  │◀──────│ state + timer    │
//! └────────────┘  ack   └──────────────────┘  ack  └────────┬─────────┘
//!                                                            │ delay
//!                                                            ▼
//!                                                  ┌──────────────────┐
//!                                                  │   ReorgNotifee   │
//!                                                  └──────────────────┘
//! ```
//!
//! - The timer starts with the first head change of a burst and is not
//!   extended by later ones.
//! - A tipset reverted after a pending apply (or applied after a pending
//!   revert) cancels out and is never dispatched.
//! - Closing flushes anything pending exactly once; later submissions fail
//!   with [`CoalescerError::Closed`].
//! - Notifee errors are logged and dropped.
//!
//! # Example
//!
//! ```rust
//! use chainhead_coalescer::{notifee_fn, HeadChangeCoalescer};
//! use chainhead_types::{BlockId, TipSet, TipSetKey};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let notifee = notifee_fn(|revert, apply| {
//!     println!("revert {} apply {}", revert.len(), apply.len());
//!     Ok(())
//! });
//! let coalescer = HeadChangeCoalescer::new(notifee, Duration::from_millis(50));
//!
//! let head = Arc::new(TipSet::new(1, vec![BlockId::digest(b"b1")], TipSetKey::default()));
//! coalescer.submit(vec![], vec![head]).await?;
//!
//! coalescer.close();
//! coalescer.closed().await;
//! # Ok(())
//! # }
//! ```

mod coalesce;
mod coalescer;
mod config;
mod dispatch;
mod error;
mod notifee;
mod scheduler;
mod stats;

pub use coalesce::{MergeOutcome, PendingChanges};
pub use coalescer::{wrap_head_change_coalescer, HeadChangeCoalescer};
pub use config::{CoalescerConfig, DEFAULT_DELAY};
pub use error::{CoalescerError, Result};
pub use notifee::{notifee_fn, ReorgNotifee};
pub use stats::CoalescerStats;
