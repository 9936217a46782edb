//! Status reconciliation: compare the last observed state with the store
//! and react to edges only.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::r#loop::{LoopConfig, PollLoop, PollStep};
use crate::sink::EventSink;
use crate::source::SnapshotSource;
use crate::tracker::StatusTracker;
use crate::types::{AccessEvent, Snapshot};

/// Continuous status reconciliation.
pub type ReconciliationLoop = PollLoop<Reconciler>;

/// One reconciliation step: fetch, diff against the tracker, emit.
pub struct Reconciler {
    source: Arc<dyn SnapshotSource>,
    tracker: StatusTracker,
    sink: Arc<dyn EventSink<AccessEvent>>,
}

impl Reconciler {
    /// Reconciler whose first fetch only sets the baseline.
    pub fn new(source: Arc<dyn SnapshotSource>, sink: Arc<dyn EventSink<AccessEvent>>) -> Self {
        Self::with_tracker(source, sink, StatusTracker::new())
    }

    /// Reconciler continuing from an already observed snapshot.
    pub fn seeded(
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn EventSink<AccessEvent>>,
        initial: &Snapshot,
    ) -> Self {
        Self::with_tracker(source, sink, StatusTracker::seeded(initial))
    }

    pub fn with_tracker(
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn EventSink<AccessEvent>>,
        tracker: StatusTracker,
    ) -> Self {
        Self {
            source,
            tracker,
            sink,
        }
    }

    pub const fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Run a single reconciliation cycle and return what it emitted.
    ///
    /// The tracker advances before the events are delivered, so a sink
    /// failure drops that cycle's events rather than replaying them.
    ///
    /// # Errors
    ///
    /// Returns a source or sink error.
    pub async fn reconcile_once(&mut self) -> Result<Vec<AccessEvent>> {
        let snapshot = self.source.fetch().await?;
        let events = self.tracker.observe(&snapshot);
        for event in &events {
            self.sink.emit(event.clone()).await?;
        }
        if events.is_empty() {
            debug!(status = ?snapshot.status(), "Converged");
        }
        Ok(events)
    }

    /// Wrap in a loop.
    pub fn into_loop(self, config: LoopConfig) -> ReconciliationLoop {
        PollLoop::new(self, config)
    }
}

#[async_trait]
impl PollStep for Reconciler {
    fn name(&self) -> &'static str {
        "reconciliation"
    }

    async fn step(&mut self) -> Result<usize> {
        Ok(self.reconcile_once().await?.len())
    }
}
