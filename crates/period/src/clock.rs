//! Period identifiers and countdown derived from wall-clock time.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Length of one period in seconds.
pub const CYCLE_SECS: u32 = keygate_core::config::CYCLE_SECS;

const CYCLES_PER_MINUTE: u32 = 60 / CYCLE_SECS;

/// Source of the current wall-clock reading.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `at`.
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            millis: AtomicI64::new(at.and_utc().timestamp_millis()),
        }
    }

    /// Jump to `at`.
    pub fn set(&self, at: NaiveDateTime) {
        self.millis
            .store(at.and_utc().timestamp_millis(), Ordering::SeqCst);
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}

/// Identifier of one 30 second period.
///
/// Orders by calendar date, then by sequence number within the day, so it
/// is strictly increasing across consecutive periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId {
    date: NaiveDate,
    sequence: u32,
}

impl PeriodId {
    /// Calendar date of the period.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// `minutes_since_midnight * 2 + cycle`, where cycle is 1 for the first
    /// half of the minute and 2 for the second. Ranges over `1..=2880`.
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The string the outcome generator hashes: `YYYYMMDD` followed by the
    /// sequence zero-padded to four digits.
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}{:04}",
            self.date.year(),
            self.date.month(),
            self.date.day(),
            self.sequence
        )
    }
}

/// Maps wall-clock readings onto the fixed 30 second cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodClock;

impl PeriodClock {
    /// Period containing `now`.
    pub fn current_period(now: &NaiveDateTime) -> PeriodId {
        let total_minutes = now.hour() * 60 + now.minute();
        let cycle = now.second() / CYCLE_SECS + 1;

        PeriodId {
            date: now.date(),
            sequence: total_minutes * CYCLES_PER_MINUTE + cycle,
        }
    }

    /// Whole seconds left in the current period, in `1..=30`.
    pub fn countdown(now: &NaiveDateTime) -> u32 {
        CYCLE_SECS - now.second() % CYCLE_SECS
    }

    /// Whole seconds already spent in the current period, in `0..30`.
    pub fn elapsed(now: &NaiveDateTime) -> u32 {
        now.second() % CYCLE_SECS
    }
}
