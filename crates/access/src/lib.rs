//! Device authorization workflow.
//!
//! ```text
//!            request_access          approve
//!   LOCKED ─────────────────▶ PENDING ────────▶ GRANTED
//!     ▲                                            │
//!     │ unblock          block (from any state)    │
//!     └──────── BLOCKED ◀──────────────────────────┘
//! ```
//!
//! - `request_access` is the only device-initiated transition and is
//!   strict: it fails with `InvalidTransition` unless the device is LOCKED.
//! - `approve` and `block` apply from any state. `approve` always draws a
//!   new activation code.
//! - `unblock` returns a BLOCKED device to LOCKED, discarding whatever it
//!   had before the block.
//! - `login` never changes the record; it only checks the code.
//!
//! Admin operations naming an unknown device are no-ops returning `None`.
//! Every check is made against the record inside the same
//! compare-and-swap that writes the new status.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod admin;
pub mod workflow;

pub use admin::{AdminGate, DirectoryOverview};
pub use workflow::{AccessAction, AuthorizationWorkflow, Session, SessionGrant, WorkflowConfig};
