//! Interval scheduler shared by every polling loop.

use std::time::Duration;

use async_trait::async_trait;
use keygate_core::PollConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Configuration for a polling loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between cycles.
    pub interval: Duration,
    /// Maximum consecutive errors before stopping.
    pub max_errors: usize,
    /// Whether to stop on first error.
    pub stop_on_error: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_errors: 10,
            stop_on_error: false,
        }
    }
}

impl LoopConfig {
    /// Status polling settings.
    pub fn status(poll: &PollConfig) -> Self {
        Self {
            interval: poll.status_interval(),
            max_errors: poll.max_errors,
            ..Self::default()
        }
    }

    /// Feed ticking settings.
    pub fn feed(poll: &PollConfig) -> Self {
        Self {
            interval: poll.feed_interval(),
            max_errors: poll.max_errors,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("loop interval must be non-zero"));
        }
        if self.max_errors == 0 {
            return Err(Error::invalid_config("max_errors must be at least 1"));
        }
        Ok(())
    }
}

/// One cycle of work run on every tick.
#[async_trait]
pub trait PollStep: Send + 'static {
    /// Name used in log lines.
    fn name(&self) -> &'static str;

    /// Run one cycle. Returns how many items were emitted.
    async fn step(&mut self) -> Result<usize>;
}

/// Runs a [`PollStep`] on a fixed interval until stopped.
///
/// The first tick fires immediately.
pub struct PollLoop<S> {
    step: S,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl<S: PollStep> PollLoop<S> {
    pub fn new(step: S, config: LoopConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            step,
            config,
            stop_rx,
            stop_tx,
        }
    }

    pub const fn step_ref(&self) -> &S {
        &self.step
    }

    /// Run the loop.
    ///
    /// This runs until stopped or max errors reached.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for a zero interval or error budget
    /// - the step's error when `stop_on_error` is set
    /// - `ReconcileFailed` once `max_errors` consecutive cycles fail
    pub async fn run(&mut self) -> Result<()> {
        self.config.validate()?;
        let name = self.step.name();
        info!(
            loop_name = name,
            interval_ms = self.config.interval.as_millis(),
            "Starting polling loop"
        );

        let mut consecutive_errors = 0usize;
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(emitted) => {
                            consecutive_errors = 0;
                            if emitted > 0 {
                                debug!(loop_name = name, emitted, "Cycle emitted");
                            }
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            error!(
                                loop_name = name,
                                error = %e,
                                consecutive = consecutive_errors,
                                "Polling error"
                            );

                            if self.config.stop_on_error {
                                return Err(e);
                            }

                            if consecutive_errors >= self.config.max_errors {
                                error!(loop_name = name, "Max errors reached, stopping loop");
                                return Err(Error::reconcile_failed(format!(
                                    "Max errors ({}) reached",
                                    self.config.max_errors
                                )));
                            }
                        }
                    }
                }
                changed = self.stop_rx.changed() => {
                    // A dropped sender also ends the loop
                    if changed.is_err() || *self.stop_rx.borrow() {
                        info!(loop_name = name, "Polling loop stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run a single cycle outside the timer.
    ///
    /// # Errors
    ///
    /// Returns the step's error.
    pub async fn run_once(&mut self) -> Result<usize> {
        if *self.stop_rx.borrow() {
            return Err(Error::LoopStopped);
        }
        self.step.step().await
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Run on the current tokio runtime.
    pub fn spawn(mut self) -> LoopHandle {
        let stopper = self.stopper();
        let task = tokio::spawn(async move { self.run().await });
        LoopHandle {
            stopper,
            task: Some(task),
        }
    }
}

/// Handle to stop a polling loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Owns a spawned loop. Dropping it stops and aborts the task.
pub struct LoopHandle {
    stopper: LoopStopper,
    task: Option<JoinHandle<Result<()>>>,
}

impl LoopHandle {
    pub fn stopper(&self) -> LoopStopper {
        self.stopper.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal the loop and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the loop's own error, or `LoopStopped` if the task was
    /// cancelled or panicked.
    pub async fn stop(mut self) -> Result<()> {
        self.stopper.stop();
        self.join().await
    }

    /// Wait for the loop to exit on its own.
    ///
    /// # Errors
    ///
    /// Same as [`LoopHandle::stop`].
    pub async fn join(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task.await.map_err(|_| Error::LoopStopped)?,
            None => Ok(()),
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.stopper.stop();
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Counting {
        ticks: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl PollStep for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn step(&mut self) -> Result<usize> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::reconcile_failed("boom"))
            } else {
                Ok(1)
            }
        }
    }

    fn counting(fail: bool) -> (Counting, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                ticks: ticks.clone(),
                fail,
            },
            ticks,
        )
    }

    fn fast() -> LoopConfig {
        LoopConfig {
            interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Given a loop that is running
    /// When stop() is called
    /// Then the loop should exit gracefully
    #[tokio::test]
    async fn stop_signal_terminates_loop() {
        let (step, ticks) = counting(false);
        let mut loop_runner = PollLoop::new(step, fast());
        let stopper = loop_runner.stopper();

        let handle = tokio::spawn(async move { loop_runner.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "Loop should stop within timeout");
        let inner = result.ok().and_then(|r| r.ok());
        assert!(matches!(inner, Some(Ok(()))));
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    /// Given a step that always fails
    /// When the loop runs with stop_on_error
    /// Then it returns the first error after one tick
    #[tokio::test]
    async fn stop_on_error_terminates_on_first_failure() {
        let (step, ticks) = counting(true);
        let mut loop_runner = PollLoop::new(
            step,
            LoopConfig {
                stop_on_error: true,
                ..fast()
            },
        );

        let result = loop_runner.run().await;
        assert!(matches!(result, Err(Error::ReconcileFailed { .. })));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    /// Given a step that always fails
    /// When the loop runs with an error budget of three
    /// Then it gives up after exactly three cycles
    #[tokio::test]
    async fn error_budget_bounds_retries() {
        let (step, ticks) = counting(true);
        let mut loop_runner = PollLoop::new(
            step,
            LoopConfig {
                max_errors: 3,
                ..fast()
            },
        );

        let result = loop_runner.run().await;
        assert!(matches!(result, Err(Error::ReconcileFailed { reason }) if reason.contains('3')));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let (step, _) = counting(false);
        let mut loop_runner = PollLoop::new(
            step,
            LoopConfig {
                interval: Duration::ZERO,
                ..Default::default()
            },
        );
        assert!(matches!(
            loop_runner.run().await,
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_once_after_stop_is_refused() {
        let (step, ticks) = counting(false);
        let mut loop_runner = PollLoop::new(step, fast());
        loop_runner.stop();
        assert!(matches!(loop_runner.run_once().await, Err(Error::LoopStopped)));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    /// Given a spawned loop
    /// When its handle is dropped
    /// Then the task stops ticking
    #[tokio::test]
    async fn dropping_handle_cancels_timer() {
        let (step, ticks) = counting(false);
        let handle = PollLoop::new(step, fast()).spawn();
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_handle_stop_returns_ok() {
        let (step, _) = counting(false);
        let handle = PollLoop::new(step, fast()).spawn();
        assert!(handle.stop().await.is_ok());
    }

    #[test]
    fn test_config_from_poll_settings() {
        let poll = PollConfig::default();
        assert_eq!(LoopConfig::status(&poll).interval, Duration::from_millis(2000));
        assert_eq!(LoopConfig::feed(&poll).interval, Duration::from_millis(1000));
    }
}
