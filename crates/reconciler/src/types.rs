//! Core types for the reconciler.

use keygate_directory::{AccessStatus, ActivationCode, DeviceId, DeviceRecord, Settings};
use serde::Serialize;

/// What one poll read from the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The local device's record, `None` if it is not registered.
    pub record: Option<DeviceRecord>,
    pub settings: Settings,
}

impl Snapshot {
    pub fn new(record: Option<DeviceRecord>, settings: Settings) -> Self {
        Self { record, settings }
    }

    pub fn status(&self) -> Option<AccessStatus> {
        self.record.as_ref().map(DeviceRecord::status)
    }
}

/// One observed edge. Emitted once per transition, never per poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AccessEvent {
    /// LOCKED or PENDING became GRANTED.
    Authorized {
        device_id: DeviceId,
        code: ActivationCode,
    },
    /// The device became BLOCKED.
    Blocked { device_id: DeviceId },
    /// Any other status change. UI refresh only.
    StatusChanged {
        device_id: DeviceId,
        from: AccessStatus,
        to: AccessStatus,
    },
    /// Product settings differ from the previous poll.
    SettingsChanged { settings: Settings },
}

impl AccessEvent {
    /// Short name used in log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authorized { .. } => "authorized",
            Self::Blocked { .. } => "blocked",
            Self::StatusChanged { .. } => "statusChanged",
            Self::SettingsChanged { .. } => "settingsChanged",
        }
    }

    /// Whether the event carries a user-facing side effect (cue, log line).
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::Authorized { .. } | Self::Blocked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let blocked = AccessEvent::Blocked {
            device_id: DeviceId::generate(),
        };
        assert_eq!(blocked.kind(), "blocked");
        assert!(blocked.is_alert());

        let changed = AccessEvent::SettingsChanged {
            settings: Settings::default(),
        };
        assert_eq!(changed.kind(), "settingsChanged");
        assert!(!changed.is_alert());
    }
}
