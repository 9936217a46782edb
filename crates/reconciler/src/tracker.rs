//! Edge detection over successive snapshots.

use keygate_directory::{AccessStatus, Settings};
use tracing::debug;

use crate::types::{AccessEvent, Snapshot};

/// Remembers the last observed status and settings, and turns a new
/// snapshot into the events for whatever changed since.
///
/// The first observation only sets the baseline. A snapshot without a
/// record (device missing from the store) emits nothing and keeps the
/// previous status.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    last_status: Option<AccessStatus>,
    last_settings: Option<Settings>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose baseline is an already known snapshot.
    pub fn seeded(snapshot: &Snapshot) -> Self {
        Self {
            last_status: snapshot.status(),
            last_settings: Some(snapshot.settings.clone()),
        }
    }

    pub const fn last_status(&self) -> Option<AccessStatus> {
        self.last_status
    }

    /// Record `snapshot` and return the events for each edge crossed.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Vec<AccessEvent> {
        let mut events = Vec::new();

        if let Some(record) = &snapshot.record {
            let to = record.status();
            if let Some(from) = self.last_status.filter(|from| *from != to) {
                let device_id = record.device_id().clone();
                let event = match (from, to, record.activation_code()) {
                    (AccessStatus::Locked | AccessStatus::Pending, AccessStatus::Granted, Some(code)) => {
                        AccessEvent::Authorized {
                            device_id,
                            code: code.clone(),
                        }
                    }
                    (_, AccessStatus::Blocked, _) => AccessEvent::Blocked { device_id },
                    _ => AccessEvent::StatusChanged { device_id, from, to },
                };
                debug!(from = %from, to = %to, event = event.kind(), "Status edge");
                events.push(event);
            }
            self.last_status = Some(to);
        }

        match &self.last_settings {
            Some(previous) if *previous != snapshot.settings => {
                events.push(AccessEvent::SettingsChanged {
                    settings: snapshot.settings.clone(),
                });
            }
            _ => {}
        }
        self.last_settings = Some(snapshot.settings.clone());

        events
    }
}
