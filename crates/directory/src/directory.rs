//! Device directory over the `users` document.

use std::sync::Arc;

use chrono::Utc;
use keygate_core::Result;
use tracing::{debug, info};

use crate::record::{AccessStatus, ActivationCode, DeviceId, DeviceRecord};
use crate::store::{decode, update_document, KeyValueStore, Write};

/// Store key of the device collection.
pub const USERS_KEY: &str = "users";

const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Persistent mapping from device id to authorization record.
///
/// Holds at most one record per device id. Records are never deleted;
/// revocation is a status change. Operations naming an unknown device are
/// no-ops that return `None`.
#[derive(Clone)]
pub struct DeviceDirectory {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl DeviceDirectory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Bound on compare-and-swap retries per write.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Every record, in registration order.
    ///
    /// # Errors
    ///
    /// Returns a store or serialization error.
    pub async fn list_all(&self) -> Result<Vec<DeviceRecord>> {
        let raw = self.store.get(USERS_KEY).await?;
        decode(raw.as_deref())
    }

    /// Record for `device_id`, if registered.
    ///
    /// # Errors
    ///
    /// Returns a store or serialization error.
    pub async fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|r| r.device_id() == device_id))
    }

    /// Insert a locked record if none exists. Returns the stored record,
    /// untouched when the device was already registered.
    ///
    /// # Errors
    ///
    /// Returns a store, serialization or conflict error.
    pub async fn register(&self, device_id: &DeviceId) -> Result<DeviceRecord> {
        let record = update_document(
            self.store.as_ref(),
            USERS_KEY,
            self.max_attempts,
            |users: &mut Vec<DeviceRecord>| {
                if let Some(existing) = users.iter().find(|r| r.device_id() == device_id) {
                    return Ok(Write::Unchanged(existing.clone()));
                }
                let record = DeviceRecord::locked(device_id.clone(), Utc::now());
                users.push(record.clone());
                Ok(Write::Commit(record))
            },
        )
        .await?;

        debug!(device_id = %device_id, status = %record.status(), "Device registered");
        Ok(record)
    }

    /// Overwrite the status of a device without any transition check.
    ///
    /// # Errors
    ///
    /// Returns a store, serialization or conflict error.
    pub async fn set_status(
        &self,
        device_id: &DeviceId,
        status: AccessStatus,
    ) -> Result<Option<DeviceRecord>> {
        let updated = self
            .modify(device_id, |record| {
                record.set_status(status);
                Ok(())
            })
            .await?;

        if updated.is_some() {
            info!(device_id = %device_id, status = %status, "Device status set");
        }
        Ok(updated.map(|(record, ())| record))
    }

    /// Grant the device with a freshly drawn activation code.
    ///
    /// Returns `None` without writing if the device is unknown.
    ///
    /// # Errors
    ///
    /// Returns a store, serialization or conflict error.
    pub async fn approve(&self, device_id: &DeviceId) -> Result<Option<ActivationCode>> {
        let updated = self
            .modify(device_id, |record| {
                let code = ActivationCode::generate();
                record.grant(code.clone());
                Ok(code)
            })
            .await?;

        if updated.is_some() {
            info!(device_id = %device_id, "Device approved");
        }
        Ok(updated.map(|(_, code)| code))
    }

    /// Atomically apply `f` to one record.
    ///
    /// `f` runs against the freshest copy and may run again if another
    /// writer got in first. If `f` fails nothing is written and its error
    /// is returned. Returns `None` for an unknown device.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or a store, serialization or conflict error.
    pub async fn modify<T, F>(&self, device_id: &DeviceId, mut f: F) -> Result<Option<(DeviceRecord, T)>>
    where
        T: Send,
        F: FnMut(&mut DeviceRecord) -> Result<T> + Send,
    {
        update_document(
            self.store.as_ref(),
            USERS_KEY,
            self.max_attempts,
            |users: &mut Vec<DeviceRecord>| {
                let Some(record) = users.iter_mut().find(|r| r.device_id() == device_id) else {
                    return Ok(Write::Unchanged(None));
                };
                let out = f(record)?;
                Ok(Write::Commit(Some((record.clone(), out))))
            },
        )
        .await
    }
}
