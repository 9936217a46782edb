//! Admin credential gate and directory overview.

use std::sync::Arc;

use itertools::Itertools;
use keygate_core::{Error, Result};
use keygate_directory::{AccessStatus, ConfigurationProvider, DeviceRecord, Settings};
use serde::Serialize;
use tracing::{info, warn};

/// Checks the admin credential against the current settings.
#[derive(Clone)]
pub struct AdminGate {
    settings: Arc<dyn ConfigurationProvider>,
}

impl AdminGate {
    pub fn new(settings: Arc<dyn ConfigurationProvider>) -> Self {
        Self { settings }
    }

    /// Succeeds if `credential` equals the configured admin credential.
    ///
    /// An empty stored credential falls back to the default one, so the
    /// admin can never be locked out by clearing it.
    ///
    /// # Errors
    ///
    /// - `CredentialMismatch` on a wrong or empty credential
    /// - a store error from the settings provider
    pub async fn authenticate(&self, credential: &str) -> Result<()> {
        let settings = self.settings.get().await?;
        let expected = if settings.admin_credential.is_empty() {
            Settings::default().admin_credential
        } else {
            settings.admin_credential
        };

        if !credential.is_empty() && credential == expected {
            info!("Admin authenticated");
            Ok(())
        } else {
            warn!("Admin authentication failed");
            Err(Error::CredentialMismatch)
        }
    }
}

/// Devices grouped the way the admin console lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryOverview {
    pub pending: Vec<DeviceRecord>,
    pub granted: Vec<DeviceRecord>,
    pub blocked: Vec<DeviceRecord>,
}

impl DirectoryOverview {
    /// Group records by status. LOCKED and REJECTED records are not listed.
    pub fn from_records(records: Vec<DeviceRecord>) -> Self {
        let mut groups = records.into_iter().into_group_map_by(DeviceRecord::status);
        let mut take = |status: AccessStatus| groups.remove(&status).unwrap_or_default();
        Self {
            pending: take(AccessStatus::Pending),
            granted: take(AccessStatus::Granted),
            blocked: take(AccessStatus::Blocked),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn granted_count(&self) -> usize {
        self.granted.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.granted.is_empty() && self.blocked.is_empty()
    }
}
