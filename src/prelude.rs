//! Prelude module - common imports for keygate users
//!
//! ```rust
//! use keygate::prelude::*;
//! ```

pub use keygate_access::{AdminGate, AuthorizationWorkflow, Session, SessionGrant};
pub use keygate_core::{Error, KeygateConfig, ResultExt};
pub use keygate_directory::{
    AccessStatus, ActivationCode, ConfigurationProvider, DeviceDirectory, DeviceId, DeviceRecord,
    KeyValueStore, Settings, SettingsPatch,
};
pub use keygate_period::{Clock, FeedFrame, OutcomeGenerator, PeriodClock, PeriodOutcome};
pub use keygate_reconciler::{
    AccessClient, AccessEvent, EventSink, LoopConfig, LoopHandle, TracingEventSink,
};

pub use crate::runtime::Keygate;
