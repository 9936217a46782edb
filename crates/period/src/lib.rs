//! Period clock and deterministic outcome generator.
//!
//! Time is cut into fixed 30 second periods. Each period gets a stable,
//! strictly increasing identifier derived from the wall clock, and each
//! identifier maps to exactly one [`PeriodOutcome`] through a salted
//! non-cryptographic hash:
//!
//! ```text
//! NaiveDateTime ──PeriodClock──▶ PeriodId ──OutcomeGenerator──▶ PeriodOutcome
//! ```
//!
//! Nothing here reads the system clock implicitly; callers pass `now`
//! (or a [`Clock`]), which keeps every function pure and testable.
//!
//! The outcome is reproducible from its inputs by construction. It is not
//! random and offers no cryptographic guarantee.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod clock;
pub mod feed;
pub mod outcome;

pub use clock::{Clock, ManualClock, PeriodClock, PeriodId, SystemClock, CYCLE_SECS};
pub use feed::{FeedFrame, FeedPhase, SignalFeed};
pub use outcome::{mix32, Category, OutcomeGenerator, PeriodOutcome, Tone};
