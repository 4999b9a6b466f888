// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Supervision strategies
//!

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, backoff::Backoff};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use std::time::Duration;

/// What to do when an actor's handler fails.
///
/// Construction and `pre_start` failures are never retried, whatever the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum SupervisionStrategy {
    /// Run `post_stop` and remove the actor.
    #[default]
    Stop,
    /// Replace the failed instance immediately, keeping the mailbox.
    Restart,
    /// Replace the failed instance after an exponential delay, giving up after
    /// too many consecutive failures.
    RestartWithBackoff(BackoffPolicy),
}

/// Parameters of [`SupervisionStrategy::RestartWithBackoff`].
///
/// The n-th consecutive restart waits `min * 2^n`, capped at `max`. The failure count goes
/// back to zero when more than `reset_window` elapsed since the previous failure. Once
/// `max_retries` consecutive failures have been restarted, the next one stops the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub min: Duration,
    pub max: Duration,
    pub max_retries: usize,
    pub reset_window: Duration,
}

impl BackoffPolicy {
    pub fn new(
        min: Duration,
        max: Duration,
        max_retries: usize,
        reset_window: Duration,
    ) -> Self {
        BackoffPolicy {
            min,
            max,
            max_retries,
            reset_window,
        }
    }

    fn exponential(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.min.min(self.max))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Decision taken for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    Stop,
    /// Restart after the given delay, if any.
    Restart(Option<Duration>),
}

/// Per-cell supervision state.
#[derive(Debug)]
pub(crate) struct Supervisor {
    strategy: SupervisionStrategy,
    backoff: Option<ExponentialBackoff>,
    failures: usize,
    last_failure: Option<Instant>,
}

impl Supervisor {
    pub(crate) fn new(strategy: SupervisionStrategy) -> Self {
        let backoff = match &strategy {
            SupervisionStrategy::RestartWithBackoff(policy) => {
                Some(policy.exponential())
            }
            _ => None,
        };
        Supervisor {
            strategy,
            backoff,
            failures: 0,
            last_failure: None,
        }
    }

    /// Consecutive failures counted so far.
    pub(crate) fn failures(&self) -> usize {
        self.failures
    }

    /// Records a handler failure observed at `now` and returns the next step.
    pub(crate) fn on_failure(&mut self, now: Instant) -> Directive {
        match &self.strategy {
            SupervisionStrategy::Stop => Directive::Stop,
            SupervisionStrategy::Restart => {
                self.failures += 1;
                Directive::Restart(None)
            }
            SupervisionStrategy::RestartWithBackoff(policy) => {
                let policy = *policy;
                if let Some(last) = self.last_failure {
                    if now.duration_since(last) > policy.reset_window {
                        self.failures = 0;
                        if let Some(backoff) = self.backoff.as_mut() {
                            backoff.reset();
                        }
                    }
                }
                self.last_failure = Some(now);
                if self.failures >= policy.max_retries {
                    return Directive::Stop;
                }
                self.failures += 1;
                let delay = self
                    .backoff
                    .as_mut()
                    .and_then(|backoff| backoff.next_backoff())
                    .unwrap_or(policy.max);
                Directive::Restart(Some(delay))
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(100),
            Duration::from_secs(2),
            3,
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_stop_strategy() {
        let mut supervisor = Supervisor::new(SupervisionStrategy::Stop);
        assert_eq!(supervisor.on_failure(Instant::now()), Directive::Stop);
    }

    #[test]
    fn test_restart_strategy_never_gives_up() {
        let mut supervisor = Supervisor::new(SupervisionStrategy::Restart);
        let now = Instant::now();
        for _ in 0..100 {
            assert_eq!(supervisor.on_failure(now), Directive::Restart(None));
        }
        assert_eq!(supervisor.failures(), 100);
    }

    #[test]
    fn test_backoff_doubles_and_stops_after_max_retries() {
        let mut supervisor =
            Supervisor::new(SupervisionStrategy::RestartWithBackoff(policy()));
        let now = Instant::now();
        assert_eq!(
            supervisor.on_failure(now),
            Directive::Restart(Some(Duration::from_millis(100)))
        );
        assert_eq!(
            supervisor.on_failure(now),
            Directive::Restart(Some(Duration::from_millis(200)))
        );
        assert_eq!(
            supervisor.on_failure(now),
            Directive::Restart(Some(Duration::from_millis(400)))
        );
        assert_eq!(supervisor.on_failure(now), Directive::Stop);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = BackoffPolicy::new(
            Duration::from_millis(500),
            Duration::from_secs(1),
            10,
            Duration::from_secs(60),
        );
        let mut supervisor =
            Supervisor::new(SupervisionStrategy::RestartWithBackoff(policy));
        let now = Instant::now();
        let delays: Vec<Directive> =
            (0..4).map(|_| supervisor.on_failure(now)).collect();
        assert_eq!(
            delays,
            vec![
                Directive::Restart(Some(Duration::from_millis(500))),
                Directive::Restart(Some(Duration::from_secs(1))),
                Directive::Restart(Some(Duration::from_secs(1))),
                Directive::Restart(Some(Duration::from_secs(1))),
            ]
        );
    }

    #[test]
    fn test_backoff_resets_after_quiet_window() {
        let mut supervisor =
            Supervisor::new(SupervisionStrategy::RestartWithBackoff(policy()));
        let start = Instant::now();
        supervisor.on_failure(start);
        supervisor.on_failure(start);
        supervisor.on_failure(start);
        assert_eq!(supervisor.failures(), 3);

        let later = start + Duration::from_secs(11);
        assert_eq!(
            supervisor.on_failure(later),
            Directive::Restart(Some(Duration::from_millis(100)))
        );
        assert_eq!(supervisor.failures(), 1);
    }
}
