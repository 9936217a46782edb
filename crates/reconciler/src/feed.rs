//! Period feed ticker.

use std::sync::Arc;

use async_trait::async_trait;
use keygate_period::{Clock, FeedFrame, SignalFeed};

use crate::error::Result;
use crate::r#loop::{LoopConfig, PollLoop, PollStep};
use crate::sink::EventSink;

/// Periodic feed refresh.
pub type FeedLoop = PollLoop<FeedTicker>;

/// Polls a [`SignalFeed`] against a clock and forwards every frame.
pub struct FeedTicker {
    feed: SignalFeed,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink<FeedFrame>>,
}

impl FeedTicker {
    pub fn new(feed: SignalFeed, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink<FeedFrame>>) -> Self {
        Self { feed, clock, sink }
    }

    /// Compute and deliver the frame for the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns the sink's error.
    pub async fn tick(&mut self) -> Result<FeedFrame> {
        let frame = self.feed.poll(&self.clock.now());
        self.sink.emit(frame.clone()).await?;
        Ok(frame)
    }

    pub fn into_loop(self, config: LoopConfig) -> FeedLoop {
        PollLoop::new(self, config)
    }
}

#[async_trait]
impl PollStep for FeedTicker {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn step(&mut self) -> Result<usize> {
        self.tick().await.map(|_| 1)
    }
}
