//! Consumers of loop output.

use async_trait::async_trait;
use keygate_period::{FeedFrame, FeedPhase};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::AccessEvent;

/// Receives every item a loop produces.
#[async_trait]
pub trait EventSink<E>: Send + Sync
where
    E: Send + 'static,
{
    async fn emit(&self, event: E) -> Result<()>;
}

/// Forwards items into an unbounded channel.
///
/// Fails once the receiver is dropped, which ends the loop after its
/// error budget.
#[derive(Debug)]
pub struct ChannelEventSink<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> ChannelEventSink<E> {
    /// Sink plus the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl<E> Clone for ChannelEventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

#[async_trait]
impl<E> EventSink<E> for ChannelEventSink<E>
where
    E: Send + 'static,
{
    async fn emit(&self, event: E) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| Error::sink_failed("receiver dropped"))
    }
}

/// Writes each item as a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink<AccessEvent> for TracingEventSink {
    async fn emit(&self, event: AccessEvent) -> Result<()> {
        match &event {
            AccessEvent::Authorized { device_id, .. } => {
                info!(device_id = %device_id, "Access granted by admin");
            }
            AccessEvent::Blocked { device_id } => {
                warn!(device_id = %device_id, "Access revoked");
            }
            AccessEvent::StatusChanged { device_id, from, to } => {
                debug!(device_id = %device_id, from = %from, to = %to, "Status changed");
            }
            AccessEvent::SettingsChanged { settings } => {
                info!(display_name = %settings.display_name, "Settings changed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink<FeedFrame> for TracingEventSink {
    async fn emit(&self, frame: FeedFrame) -> Result<()> {
        match &frame.phase {
            FeedPhase::Revealed {
                outcome,
                fresh: true,
            } => {
                info!(
                    period = %frame.period,
                    value = outcome.value,
                    category = ?outcome.category,
                    confidence = outcome.confidence,
                    "New signal"
                );
            }
            _ => debug!(period = %frame.period, countdown = frame.countdown, "Feed tick"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keygate_directory::DeviceId;

    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() -> Result<()> {
        let (sink, mut rx) = ChannelEventSink::new();
        sink.emit(1_u32).await?;
        sink.emit(2_u32).await?;
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_channel_sink_fails_without_receiver() {
        let (sink, rx) = ChannelEventSink::<u32>::new();
        drop(rx);
        assert!(matches!(sink.emit(7).await, Err(Error::SinkFailed { .. })));
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_everything() -> Result<()> {
        let sink = TracingEventSink;
        sink.emit(AccessEvent::Blocked {
            device_id: DeviceId::generate(),
        })
        .await
    }
}
