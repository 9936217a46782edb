//! Edge-triggered reconciliation for the device side of keygate.
//!
//! A device learns about admin decisions by polling its own record. Polling
//! sees levels; the user should only ever see edges. This crate turns the
//! former into the latter:
//!
//! ```text
//! SnapshotSource ──fetch──▶ StatusTracker ──edges──▶ EventSink
//!        ▲                                             │
//!        └────────────── PollLoop (interval) ──────────┘
//! ```
//!
//! - **Snapshot**: the device's record and the product settings as read on
//!   one tick.
//! - **Tracker**: remembers the last status and settings and emits one
//!   [`AccessEvent`] per change, never one per poll.
//! - **Loop**: [`PollLoop`] runs any [`PollStep`] on an interval with a
//!   stop signal and an error budget. The same scheduler drives the period
//!   feed ([`FeedLoop`]).
//!
//! Each part can be driven without timers: feed a [`ScriptedSource`] into a
//! [`Reconciler`] and call `reconcile_once`.
//!
//! # Example
//!
//! ```ignore
//! use keygate_reconciler::{AccessClient, LoopConfig, TracingEventSink};
//!
//! let client = AccessClient::start(workflow, settings, store.as_ref()).await?;
//! let handle = client.watch(Arc::new(TracingEventSink), LoopConfig::default());
//! // ...
//! handle.stop().await?;
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod client;
pub mod error;
pub mod feed;
pub mod r#loop;
pub mod reconciler;
pub mod sink;
pub mod source;
pub mod tracker;
pub mod types;

// Re-export main types
pub use client::AccessClient;
pub use error::{Error, Result};
pub use feed::{FeedLoop, FeedTicker};
pub use r#loop::{LoopConfig, LoopHandle, LoopStopper, PollLoop, PollStep};
pub use reconciler::{Reconciler, ReconciliationLoop};
pub use sink::{ChannelEventSink, EventSink, TracingEventSink};
pub use source::{DirectorySnapshotSource, ScriptedSource, SnapshotSource};
pub use tracker::StatusTracker;
pub use types::{AccessEvent, Snapshot};
