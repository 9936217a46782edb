//! Where snapshots come from.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use keygate_directory::{ConfigurationProvider, DeviceDirectory, DeviceId, Settings};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::Snapshot;

/// Supplies the authoritative state once per poll.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot>;
}

/// Re-reads one device's record and the current settings from the store.
///
/// Only a failed record read fails the fetch. A failed settings read keeps
/// the last settings seen, or the defaults before any were read.
#[derive(Clone)]
pub struct DirectorySnapshotSource {
    directory: DeviceDirectory,
    settings: Arc<dyn ConfigurationProvider>,
    device_id: DeviceId,
    last_settings: Arc<Mutex<Option<Settings>>>,
}

impl DirectorySnapshotSource {
    pub fn new(
        directory: DeviceDirectory,
        settings: Arc<dyn ConfigurationProvider>,
        device_id: DeviceId,
    ) -> Self {
        Self {
            directory,
            settings,
            device_id,
            last_settings: Arc::new(Mutex::new(None)),
        }
    }

    /// Start from `settings` instead of the defaults.
    #[must_use]
    pub fn with_last_settings(mut self, settings: Settings) -> Self {
        self.last_settings = Arc::new(Mutex::new(Some(settings)));
        self
    }

    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

#[async_trait]
impl SnapshotSource for DirectorySnapshotSource {
    async fn fetch(&self) -> Result<Snapshot> {
        let record = self.directory.get(&self.device_id).await?;
        let mut last = self.last_settings.lock().await;
        let settings = match self.settings.get().await {
            Ok(settings) => {
                *last = Some(settings.clone());
                settings
            }
            Err(e) => {
                warn!(
                    device_id = %self.device_id,
                    error = %e,
                    "Settings read failed, keeping last known settings"
                );
                last.clone().unwrap_or_default()
            }
        };
        Ok(Snapshot::new(record, settings))
    }
}

/// Replays a fixed sequence of snapshots, one per fetch.
///
/// Fails with `ReconcileFailed` once exhausted.
pub struct ScriptedSource {
    snapshots: Mutex<VecDeque<Snapshot>>,
}

impl ScriptedSource {
    pub fn new(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into_iter().collect()),
        }
    }

    pub async fn remaining(&self) -> usize {
        self.snapshots.lock().await.len()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> Result<Snapshot> {
        self.snapshots
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| Error::reconcile_failed("snapshot script exhausted"))
    }
}
