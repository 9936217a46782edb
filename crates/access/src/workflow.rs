//! Authorization state machine over the device directory.

use std::fmt;

use chrono::{DateTime, Utc};
use keygate_core::{AccessConfig, Error, Result};
use keygate_directory::{AccessStatus, ActivationCode, DeviceDirectory, DeviceId, DeviceRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::admin::DirectoryOverview;

/// A status-changing operation on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessAction {
    RequestAccess,
    Approve,
    Block,
    Unblock,
}

impl AccessAction {
    /// Status reached by applying this action in `from`, or `None` if the
    /// action is not allowed there.
    pub const fn target(self, from: AccessStatus) -> Option<AccessStatus> {
        match (self, from) {
            (Self::RequestAccess, AccessStatus::Locked) => Some(AccessStatus::Pending),
            (Self::Approve, _) => Some(AccessStatus::Granted),
            (Self::Block, _) => Some(AccessStatus::Blocked),
            (Self::Unblock, AccessStatus::Blocked) => Some(AccessStatus::Locked),
            _ => None,
        }
    }

    /// Every action allowed in `from`.
    pub fn available(from: AccessStatus) -> Vec<Self> {
        [Self::RequestAccess, Self::Approve, Self::Block, Self::Unblock]
            .into_iter()
            .filter(|action| action.target(from).is_some())
            .collect()
    }
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RequestAccess => "request access",
            Self::Approve => "approve",
            Self::Block => "block",
            Self::Unblock => "unblock",
        };
        write!(f, "{s}")
    }
}

/// Workflow knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Code that logs in any device regardless of its record. Development
    /// use only; `None` disables it.
    pub bypass_code: Option<String>,
}

impl From<&AccessConfig> for WorkflowConfig {
    fn from(config: &AccessConfig) -> Self {
        Self {
            bypass_code: config.bypass_code.clone(),
        }
    }
}

/// How a session was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionGrant {
    ActivationCode,
    Bypass,
}

/// Proof of a successful login. The directory record is not touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub device_id: DeviceId,
    pub grant: SessionGrant,
    pub started_at: DateTime<Utc>,
}

/// Device lifecycle: registration, request, admin decision, revocation.
#[derive(Clone)]
pub struct AuthorizationWorkflow {
    directory: DeviceDirectory,
    config: WorkflowConfig,
}

impl AuthorizationWorkflow {
    pub fn new(directory: DeviceDirectory) -> Self {
        Self::with_config(directory, WorkflowConfig::default())
    }

    pub fn with_config(directory: DeviceDirectory, config: WorkflowConfig) -> Self {
        if config.bypass_code.is_some() {
            warn!("Login bypass code is enabled");
        }
        Self { directory, config }
    }

    pub const fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Register a device as LOCKED. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn register(&self, device_id: &DeviceId) -> Result<DeviceRecord> {
        self.directory.register(device_id).await
    }

    /// Current record, if registered.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn status(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>> {
        self.directory.get(device_id).await
    }

    /// LOCKED → PENDING, stamping the request time.
    ///
    /// # Errors
    ///
    /// - `UnknownDevice` if the device never registered
    /// - `InvalidTransition` if the device is not LOCKED
    pub async fn request_access(&self, device_id: &DeviceId) -> Result<DeviceRecord> {
        let record = self
            .transition(device_id, AccessAction::RequestAccess, true)
            .await?
            .ok_or_else(|| Error::unknown_device(device_id.as_str()))?;

        info!(device_id = %device_id, "Access requested");
        Ok(record)
    }

    /// Grant from any state with a fresh activation code.
    ///
    /// Returns `None` for an unknown device.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn approve(&self, device_id: &DeviceId) -> Result<Option<ActivationCode>> {
        let code = self.directory.approve(device_id).await?;
        if code.is_none() {
            debug!(device_id = %device_id, "Approve ignored for unknown device");
        }
        Ok(code)
    }

    /// Move to BLOCKED from any state.
    ///
    /// Returns `None` for an unknown device.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn block(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>> {
        let record = self
            .transition(device_id, AccessAction::Block, false)
            .await?;
        if record.is_some() {
            info!(device_id = %device_id, "Device blocked");
        }
        Ok(record)
    }

    /// BLOCKED → LOCKED. The device starts the flow over.
    ///
    /// Returns `None` for an unknown device.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` if the device is not BLOCKED
    /// - a store error
    pub async fn unblock(&self, device_id: &DeviceId) -> Result<Option<DeviceRecord>> {
        let record = self
            .transition(device_id, AccessAction::Unblock, false)
            .await?;
        if record.is_some() {
            info!(device_id = %device_id, "Device unblocked");
        }
        Ok(record)
    }

    /// Check `code` for a device.
    ///
    /// Succeeds if the device is GRANTED and `code` equals its activation
    /// code, or if a non-blank bypass code is configured and `code` equals
    /// it. Codes are compared exactly, without trimming.
    ///
    /// # Errors
    ///
    /// - `CredentialMismatch` for any other combination, including an
    ///   unknown device
    /// - a store error
    pub async fn login(&self, device_id: &DeviceId, code: &str) -> Result<Session> {
        let record = self.directory.get(device_id).await?;

        let by_code = record
            .as_ref()
            .and_then(DeviceRecord::activation_code)
            .is_some_and(|stored| stored.matches(code));

        let grant = if by_code {
            SessionGrant::ActivationCode
        } else if self.bypass_matches(code) {
            warn!(device_id = %device_id, "Login admitted by bypass code");
            SessionGrant::Bypass
        } else {
            info!(
                device_id = %device_id,
                status = ?record.as_ref().map(DeviceRecord::status),
                "Login rejected"
            );
            return Err(Error::CredentialMismatch);
        };

        info!(device_id = %device_id, grant = ?grant, "Session started");
        Ok(Session {
            device_id: device_id.clone(),
            grant,
            started_at: Utc::now(),
        })
    }

    /// Pending, granted and blocked devices.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn overview(&self) -> Result<DirectoryOverview> {
        Ok(DirectoryOverview::from_records(
            self.directory.list_all().await?,
        ))
    }

    fn bypass_matches(&self, code: &str) -> bool {
        self.config
            .bypass_code
            .as_deref()
            .filter(|bypass| !bypass.trim().is_empty())
            .is_some_and(|bypass| bypass == code)
    }

    /// Guarded status change, checked against the record being replaced.
    async fn transition(
        &self,
        device_id: &DeviceId,
        action: AccessAction,
        stamp: bool,
    ) -> Result<Option<DeviceRecord>> {
        let updated = self
            .directory
            .modify(device_id, |record| {
                let from = record.status();
                let to = action.target(from).ok_or_else(|| {
                    Error::invalid_transition(device_id.as_str(), from.to_string(), action.to_string())
                })?;
                record.set_status(to);
                if stamp {
                    record.touch(Utc::now());
                }
                Ok(())
            })
            .await?;
        Ok(updated.map(|(record, ())| record))
    }
}
