//! Shared, persistent device directory.
//!
//! The directory is the single source of truth for authorization state.
//! It is deliberately dumb: it stores and mutates [`DeviceRecord`]s but
//! does not decide which status changes are legal; that lives in the
//! access workflow.
//!
//! # Storage
//!
//! Everything persists through a [`KeyValueStore`] holding JSON documents:
//!
//! - `users`: ordered list of device records
//! - `settings`: partial product settings, merged over defaults on read
//! - `device_id.v2`: this installation's stable device identifier
//!
//! Writers never blindly overwrite a document. Each write re-reads the
//! document and commits with compare-and-swap, retrying on conflict.
//! Updates are lost-update free for every writer sharing one store
//! instance. [`FileStore`] serializes its swaps with an in-process mutex,
//! so separate processes pointed at the same directory are not covered
//! and should share one process or a store with native compare-and-swap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod directory;
pub mod identity;
pub mod record;
pub mod settings;
pub mod store;

pub use directory::{DeviceDirectory, USERS_KEY};
pub use identity::{load_or_create_device_id, DEVICE_ID_KEY};
pub use record::{AccessStatus, ActivationCode, DeviceId, DeviceRecord};
pub use settings::{ConfigurationProvider, Settings, SettingsPatch, StoredSettings, SETTINGS_KEY};
pub use store::{update_document, FileStore, InMemoryStore, KeyValueStore, TracingStore, Write};
