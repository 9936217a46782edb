//! Per-tick view of the current period for a polling display.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{PeriodClock, PeriodId, CYCLE_SECS};
use crate::outcome::{OutcomeGenerator, PeriodOutcome};

/// What the display should show on this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedPhase {
    /// Start of a period; the outcome is withheld.
    Analyzing,
    /// Outcome visible. `fresh` is set on the first revealed tick of a
    /// period and never again for that period.
    Revealed { outcome: PeriodOutcome, fresh: bool },
}

/// One poll of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFrame {
    pub period: PeriodId,
    pub countdown: u32,
    pub phase: FeedPhase,
}

impl FeedFrame {
    /// Whether this frame should trigger the one-shot "new signal" cue.
    pub const fn is_fresh(&self) -> bool {
        matches!(self.phase, FeedPhase::Revealed { fresh: true, .. })
    }

    pub const fn outcome(&self) -> Option<&PeriodOutcome> {
        match &self.phase {
            FeedPhase::Analyzing => None,
            FeedPhase::Revealed { outcome, .. } => Some(outcome),
        }
    }
}

/// Edge-detecting feed over the period clock.
///
/// Polled at any rate; reveals each period's outcome once the analysis
/// window has passed and flags the first reveal per period.
#[derive(Debug, Clone)]
pub struct SignalFeed {
    generator: OutcomeGenerator,
    analysis_window_secs: u32,
    last_revealed: Option<PeriodId>,
}

impl SignalFeed {
    pub fn new(generator: OutcomeGenerator, analysis_window_secs: u32) -> Self {
        Self {
            generator,
            analysis_window_secs: analysis_window_secs.min(CYCLE_SECS - 1),
            last_revealed: None,
        }
    }

    pub fn from_config(config: &keygate_core::KeygateConfig) -> Self {
        Self::new(
            OutcomeGenerator::from_config(&config.outcome),
            config.feed.analysis_window_secs,
        )
    }

    /// Period most recently revealed, if any.
    pub const fn last_revealed(&self) -> Option<PeriodId> {
        self.last_revealed
    }

    /// Compute the frame for `now`.
    pub fn poll(&mut self, now: &NaiveDateTime) -> FeedFrame {
        let period = PeriodClock::current_period(now);
        let countdown = PeriodClock::countdown(now);

        let phase = if PeriodClock::elapsed(now) < self.analysis_window_secs {
            FeedPhase::Analyzing
        } else {
            let fresh = self.last_revealed != Some(period);
            if fresh {
                debug!(period = %period, "New period revealed");
                self.last_revealed = Some(period);
            }
            FeedPhase::Revealed {
                outcome: self.generator.generate_for(&period),
                fresh,
            }
        };

        FeedFrame {
            period,
            countdown,
            phase,
        }
    }
}

impl Default for SignalFeed {
    fn default() -> Self {
        Self::from_config(&keygate_core::KeygateConfig::default())
    }
}
