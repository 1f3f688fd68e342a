//! Continuous queries.
//!
//! A [`ContinuousQuery`] re-runs a caller-supplied step at a fixed interval
//! until its cancellation flag is set or an iteration limit is reached. A
//! failing step is logged and the loop carries on.

use std::time::{Duration, Instant};

use lsmvec_vector::CancellationFlag;
use tracing::{debug, warn};

use crate::error::Result;

/// Longest single sleep between cancellation checks.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Outcome of a continuous query run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Steps executed.
    pub iterations: u64,
    /// Steps that returned an error.
    pub failures: u64,
}

/// Periodic driver of a query step.
#[derive(Debug, Clone)]
pub struct ContinuousQuery {
    interval: Duration,
    max_iterations: Option<u64>,
    cancel: CancellationFlag,
}

impl ContinuousQuery {
    /// Run every `interval` until `cancel` is set.
    #[must_use]
    pub const fn new(interval: Duration, cancel: CancellationFlag) -> Self {
        Self { interval, max_iterations: None, cancel }
    }

    /// Stop after `limit` steps.
    #[must_use]
    pub const fn with_max_iterations(mut self, limit: u64) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    /// The flag that stops the loop.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Drive `step` until cancelled or the iteration limit is reached.
    ///
    /// `step` receives the zero-based iteration number.
    pub fn run<F>(&self, mut step: F) -> RunStats
    where
        F: FnMut(u64) -> Result<()>,
    {
        let mut stats = RunStats::default();
        while !self.done(&stats) {
            let started = Instant::now();
            if let Err(e) = step(stats.iterations) {
                stats.failures += 1;
                warn!(iteration = stats.iterations, error = %e, "continuous query step failed");
            }
            stats.iterations += 1;
            if self.done(&stats) {
                break;
            }
            self.pause(self.interval.saturating_sub(started.elapsed()));
        }
        debug!(
            iterations = stats.iterations,
            failures = stats.failures,
            "continuous query stopped"
        );
        stats
    }

    fn done(&self, stats: &RunStats) -> bool {
        self.cancel.is_cancelled() || self.max_iterations.is_some_and(|max| stats.iterations >= max)
    }

    fn pause(&self, mut remaining: Duration) {
        while !remaining.is_zero() && !self.cancel.is_cancelled() {
            let slice = remaining.min(POLL_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn stops_at_iteration_limit() {
        let query =
            ContinuousQuery::new(Duration::ZERO, CancellationFlag::new()).with_max_iterations(5);
        let mut seen = Vec::new();
        let stats = query.run(|i| {
            seen.push(i);
            Ok(())
        });
        assert_eq!(stats, RunStats { iterations: 5, failures: 0 });
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn failures_do_not_stop_the_loop() {
        let query =
            ContinuousQuery::new(Duration::ZERO, CancellationFlag::new()).with_max_iterations(4);
        let stats = query.run(|i| {
            if i % 2 == 0 {
                Err(Error::Semantic("step failed".to_string()))
            } else {
                Ok(())
            }
        });
        assert_eq!(stats, RunStats { iterations: 4, failures: 2 });
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let cancel = CancellationFlag::new();
        let query = ContinuousQuery::new(Duration::from_millis(1), cancel.clone());
        let stats = query.run(|i| {
            if i == 2 {
                cancel.cancel();
            }
            Ok(())
        });
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn already_cancelled_runs_nothing() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let stats = ContinuousQuery::new(Duration::ZERO, cancel).run(|_| Ok(()));
        assert_eq!(stats.iterations, 0);
    }
}
