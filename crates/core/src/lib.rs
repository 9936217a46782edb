//! Core types shared by every keygate crate.
//!
//! - [`Error`] / [`Result`]: the single failure taxonomy. Nothing here is
//!   fatal to the caller; every failure is a value.
//! - [`ResultExt`]: combinators for call sites that must stay responsive
//!   regardless of outcome.
//! - [`config`]: TOML runtime configuration with environment overrides.
//! - [`telemetry`]: tracing subscriber bootstrap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod error;
pub mod result;
pub mod telemetry;

pub use config::{
    load_config, AccessConfig, FeedConfig, KeygateConfig, LogConfig, OutcomeConfig, PollConfig,
    StorageConfig,
};
pub use error::Error;
pub use result::{Result, ResultExt};
