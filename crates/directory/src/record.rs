//! Device authorization records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use keygate_core::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable identifier of one client installation.
///
/// Deserialization goes through [`DeviceId::parse`], so a stored record
/// with a blank id is rejected on read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `raw` is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_config("device id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Fresh `DEV-` identifier with six zero-padded random digits.
    pub fn generate() -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self(format!("DEV-{n:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short numeric credential issued on approval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationCode(String);

impl ActivationCode {
    /// Uniform four digit code in `1000..=9999`, drawn independently per call.
    pub fn generate() -> Self {
        let n: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a user-supplied code matches. The comparison is exact.
    pub fn matches(&self, supplied: &str) -> bool {
        self.0 == supplied
    }
}

impl fmt::Display for ActivationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessStatus {
    /// Registered, no request made.
    Locked,
    /// Request awaiting an admin decision.
    Pending,
    /// Approved; an activation code is on record.
    Granted,
    /// Reserved. No transition produces it.
    Rejected,
    /// Revoked by an admin.
    Blocked,
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Locked => "LOCKED",
            Self::Pending => "PENDING",
            Self::Granted => "GRANTED",
            Self::Rejected => "REJECTED",
            Self::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// One device's entry in the directory.
///
/// The stored activation code survives block/unblock, but it is only
/// visible through [`DeviceRecord::activation_code`] while the device is
/// granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    device_id: DeviceId,
    status: AccessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    activation_code: Option<ActivationCode>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    request_time: DateTime<Utc>,
}

impl DeviceRecord {
    /// A freshly registered, locked record.
    pub fn locked(device_id: DeviceId, now: DateTime<Utc>) -> Self {
        Self {
            device_id,
            status: AccessStatus::Locked,
            activation_code: None,
            request_time: to_wire_precision(now),
        }
    }

    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub const fn status(&self) -> AccessStatus {
        self.status
    }

    /// The activation code, present only while granted.
    pub fn activation_code(&self) -> Option<&ActivationCode> {
        self.activation_code
            .as_ref()
            .filter(|_| self.status == AccessStatus::Granted)
    }

    /// Time of the last registration or access request.
    pub const fn request_time(&self) -> DateTime<Utc> {
        self.request_time
    }

    /// Overwrite the status. The stored code is kept.
    pub fn set_status(&mut self, status: AccessStatus) {
        self.status = status;
    }

    /// Grant with `code`, replacing any earlier one.
    pub fn grant(&mut self, code: ActivationCode) {
        self.status = AccessStatus::Granted;
        self.activation_code = Some(code);
    }

    /// Stamp a new request time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.request_time = to_wire_precision(now);
    }
}

/// Request times are stored as epoch milliseconds.
fn to_wire_precision(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(3)
}
