//! Wiring from runtime configuration to live components.

use std::sync::Arc;

use keygate_access::{AdminGate, AuthorizationWorkflow, WorkflowConfig};
use keygate_core::KeygateConfig;
use keygate_directory::{
    ConfigurationProvider, DeviceDirectory, FileStore, KeyValueStore, StoredSettings,
    TracingStore,
};
use keygate_period::{Clock, FeedFrame, SignalFeed};
use keygate_reconciler::{
    AccessClient, AccessEvent, EventSink, FeedTicker, LoopConfig, LoopHandle, Result,
};
use tracing::info;

/// Every component over one shared store.
#[derive(Clone)]
pub struct Keygate {
    config: KeygateConfig,
    store: Arc<dyn KeyValueStore>,
    settings: Arc<dyn ConfigurationProvider>,
    workflow: AuthorizationWorkflow,
}

impl Keygate {
    /// Open the file store named by `config.storage.dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage directory cannot be created.
    pub async fn open(config: KeygateConfig) -> Result<Self> {
        let store = FileStore::open(&config.storage.dir).await?;
        info!(dir = %store.root().display(), "Keygate storage opened");
        Ok(Self::with_store(config, Arc::new(TracingStore::new(store))))
    }

    /// Use an existing store.
    pub fn with_store(config: KeygateConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let settings: Arc<dyn ConfigurationProvider> = Arc::new(StoredSettings::new(store.clone()));
        let workflow = AuthorizationWorkflow::with_config(
            DeviceDirectory::new(store.clone()),
            WorkflowConfig::from(&config.access),
        );
        Self {
            config,
            store,
            settings,
            workflow,
        }
    }

    /// Install the global subscriber at the configured `log.level`.
    /// `RUST_LOG` still wins. Returns `false` if one was already set.
    pub fn init_tracing(&self) -> bool {
        keygate_core::telemetry::init_tracing(&self.config.log.level)
    }

    pub const fn config(&self) -> &KeygateConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn settings(&self) -> &Arc<dyn ConfigurationProvider> {
        &self.settings
    }

    /// The admin-side workflow.
    pub const fn workflow(&self) -> &AuthorizationWorkflow {
        &self.workflow
    }

    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(self.settings.clone())
    }

    /// Start the device side for this installation.
    ///
    /// # Errors
    ///
    /// See [`AccessClient::start`].
    pub async fn client(&self) -> Result<AccessClient> {
        AccessClient::start(
            self.workflow.clone(),
            self.settings.clone(),
            self.store.as_ref(),
        )
        .await
    }

    /// Spawn the status reconciliation loop for `client`.
    pub fn watch_status(
        &self,
        client: &AccessClient,
        sink: Arc<dyn EventSink<AccessEvent>>,
    ) -> LoopHandle {
        client.watch(sink, LoopConfig::status(&self.config.poll))
    }

    /// Spawn the period feed against `clock`.
    pub fn watch_feed(
        &self,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink<FeedFrame>>,
    ) -> LoopHandle {
        FeedTicker::new(SignalFeed::from_config(&self.config), clock, sink)
            .into_loop(LoopConfig::feed(&self.config.poll))
            .spawn()
    }
}
