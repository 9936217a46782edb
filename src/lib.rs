#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Keygate
//!
//! Poll-based device authorization with deterministic per-period signals.
//!
//! A device registers itself, asks for access and waits while an admin
//! approves or blocks it. Both sides share one persistent directory; the
//! device learns about decisions by polling and reacts to edges only. In
//! the meantime a period feed publishes a reproducible outcome every 30
//! seconds.
//!
//! This library re-exports the workspace crates and wires them together
//! from a [`KeygateConfig`](keygate_core::KeygateConfig).

pub use keygate_access;
pub use keygate_core;
pub use keygate_directory;
pub use keygate_period;
pub use keygate_reconciler;

pub mod prelude;
pub mod runtime;

pub use runtime::Keygate;
