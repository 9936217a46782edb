//! Device-side session: identity, registration and status watching.

use std::sync::Arc;

use keygate_access::{AuthorizationWorkflow, Session};
use keygate_core::ResultExt;
use keygate_directory::{
    load_or_create_device_id, ConfigurationProvider, DeviceId, DeviceRecord, KeyValueStore,
    Settings,
};
use tracing::info;

use crate::error::Result;
use crate::r#loop::{LoopConfig, LoopHandle};
use crate::reconciler::{Reconciler, ReconciliationLoop};
use crate::sink::EventSink;
use crate::source::DirectorySnapshotSource;
use crate::types::{AccessEvent, Snapshot};

/// The local device's view of the authorization flow.
pub struct AccessClient {
    device_id: DeviceId,
    workflow: AuthorizationWorkflow,
    settings: Arc<dyn ConfigurationProvider>,
    initial: Snapshot,
}

impl AccessClient {
    /// Provision this installation's id, register it and read the initial
    /// state.
    ///
    /// # Errors
    ///
    /// Returns a store error if the id cannot be provisioned or the device
    /// cannot be registered.
    pub async fn start(
        workflow: AuthorizationWorkflow,
        settings: Arc<dyn ConfigurationProvider>,
        identity_store: &dyn KeyValueStore,
    ) -> Result<Self> {
        let device_id = load_or_create_device_id(identity_store).await?;
        let record = workflow.register(&device_id).await?;
        // Settings are cosmetic; the first successful poll corrects them
        let current = settings.get().await.or_default_logged(Settings::default());
        let initial = Snapshot::new(Some(record), current);

        info!(
            device_id = %device_id,
            status = ?initial.status(),
            "Client started"
        );
        Ok(Self {
            device_id,
            workflow,
            settings,
            initial,
        })
    }

    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// State read at startup; the reconciliation baseline.
    pub const fn initial(&self) -> &Snapshot {
        &self.initial
    }

    /// Ask the admin for access.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationWorkflow::request_access`].
    pub async fn request_access(&self) -> Result<DeviceRecord> {
        Ok(self.workflow.request_access(&self.device_id).await?)
    }

    /// Log in with an activation code.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationWorkflow::login`].
    pub async fn login(&self, code: &str) -> Result<Session> {
        Ok(self.workflow.login(&self.device_id, code).await?)
    }

    /// Reconciliation loop watching this device, seeded with the startup
    /// state.
    pub fn reconciliation_loop(
        &self,
        sink: Arc<dyn EventSink<AccessEvent>>,
        config: LoopConfig,
    ) -> ReconciliationLoop {
        let source = DirectorySnapshotSource::new(
            self.workflow.directory().clone(),
            self.settings.clone(),
            self.device_id.clone(),
        )
        .with_last_settings(self.initial.settings.clone());
        Reconciler::seeded(Arc::new(source), sink, &self.initial).into_loop(config)
    }

    /// Spawn [`AccessClient::reconciliation_loop`] on the current runtime.
    pub fn watch(&self, sink: Arc<dyn EventSink<AccessEvent>>, config: LoopConfig) -> LoopHandle {
        self.reconciliation_loop(sink, config).spawn()
    }
}
