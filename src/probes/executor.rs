// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Bounded Concurrent Probe Executor
 * Windowed concurrency with per-probe timeouts and a batch deadline
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::ScanResult;
use crate::types::ProbeOutcome;

/// Executes a batch of probes concurrently. Each probe races its own
/// timeout; the batch as a whole races a wall-clock deadline. Probes that
/// have not been scheduled when the deadline passes are recorded as
/// `TimedOut` without ever starting, which bounds total latency
/// independently of batch size.
///
/// A timed out probe is abandoned: the future is dropped at the race, but
/// any operation it already handed to the runtime may keep running until
/// it resolves on its own.
#[derive(Debug, Clone, Copy)]
pub struct ProbeExecutor {
    width: usize,
    probe_timeout: Duration,
}

impl ProbeExecutor {
    pub fn new(width: usize, probe_timeout: Duration) -> Self {
        Self {
            width: width.max(1),
            probe_timeout,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Deadline helper for callers expressing budgets as durations
    pub fn deadline_in(budget: Duration) -> Instant {
        Instant::now() + budget
    }

    /// Run every probe, returning one outcome per input in input order.
    /// No probe failure crosses this boundary; every path yields a value.
    pub async fn run_batch<T, F, Fut>(
        &self,
        probes: Vec<F>,
        deadline: Instant,
    ) -> Vec<ProbeOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ScanResult<T>>,
    {
        let total = probes.len();
        let probe_timeout = self.probe_timeout;

        let completed: Vec<(usize, ProbeOutcome<T>)> =
            stream::iter(probes.into_iter().enumerate())
                .map(|(index, probe)| async move {
                    let now = Instant::now();
                    if now >= deadline {
                        // Budget exhausted before this probe got a slot
                        return (index, ProbeOutcome::TimedOut);
                    }

                    let budget = probe_timeout.min(deadline.duration_since(now));
                    let outcome = match tokio::time::timeout(budget, probe()).await {
                        Ok(Ok(value)) => ProbeOutcome::Success(value),
                        Ok(Err(e)) => ProbeOutcome::Failure(e.to_string()),
                        Err(_) => ProbeOutcome::TimedOut,
                    };

                    (index, outcome)
                })
                .buffer_unordered(self.width)
                .collect()
                .await;

        // Results arrive in completion order; restore input order
        let mut slots: Vec<Option<ProbeOutcome<T>>> = (0..total).map(|_| None).collect();
        for (index, outcome) in completed {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(ProbeOutcome::TimedOut))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScanError;

    type BoxedProbe = std::pin::Pin<Box<dyn Future<Output = ScanResult<u32>> + Send>>;

    fn quick(value: u32) -> BoxedProbe {
        Box::pin(async move { Ok(value) })
    }

    #[tokio::test]
    async fn test_results_preserve_input_order() {
        let executor = ProbeExecutor::new(4, Duration::from_secs(1));
        let deadline = ProbeExecutor::deadline_in(Duration::from_secs(5));

        // Earlier probes sleep longer, so completion order is reversed
        let probes: Vec<_> = (0..4u32)
            .map(|i| {
                move || async move {
                    tokio::time::sleep(Duration::from_millis((4 - i as u64) * 20)).await;
                    Ok(i)
                }
            })
            .collect();

        let outcomes = executor.run_batch(probes, deadline).await;
        let values: Vec<u32> = outcomes
            .into_iter()
            .map(|o| o.into_success().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_slow_probe_times_out_without_blocking_batch() {
        let executor = ProbeExecutor::new(4, Duration::from_millis(50));
        let deadline = ProbeExecutor::deadline_in(Duration::from_secs(5));

        let probes: Vec<Box<dyn FnOnce() -> BoxedProbe + Send>> = vec![
            Box::new(|| quick(1)),
            Box::new(|| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(2)
                })
            }),
            Box::new(|| quick(3)),
        ];

        let started = std::time::Instant::now();
        let outcomes = executor.run_batch(probes, deadline).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(outcomes[0].is_success());
        assert!(outcomes[1].is_timed_out());
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_thrown() {
        let executor = ProbeExecutor::new(2, Duration::from_secs(1));
        let deadline = ProbeExecutor::deadline_in(Duration::from_secs(5));

        let probes: Vec<_> = vec![|| async {
            Err::<u32, _>(ScanError::General("probe exploded".to_string()))
        }];

        let outcomes = executor.run_batch(probes, deadline).await;
        match &outcomes[0] {
            ProbeOutcome::Failure(reason) => assert!(reason.contains("probe exploded")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deadline_skips_unscheduled_probes() {
        // Width 1 forces serial execution; the first probe eats the whole
        // budget so the rest must be skipped as TimedOut.
        let executor = ProbeExecutor::new(1, Duration::from_millis(300));
        let deadline = ProbeExecutor::deadline_in(Duration::from_millis(100));

        let probes: Vec<_> = (0..5u32)
            .map(|i| {
                move || async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok(i)
                }
            })
            .collect();

        let started = std::time::Instant::now();
        let outcomes = executor.run_batch(probes, deadline).await;

        // Bounded latency: the batch ends near the deadline, not at 5x200ms
        assert!(started.elapsed() < Duration::from_millis(800));
        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(|o| o.is_timed_out()));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = ProbeExecutor::new(8, Duration::from_secs(1));
        let deadline = ProbeExecutor::deadline_in(Duration::from_secs(1));
        let probes: Vec<fn() -> std::pin::Pin<Box<dyn Future<Output = ScanResult<u32>> + Send>>> =
            Vec::new();
        let outcomes = executor.run_batch(probes, deadline).await;
        assert!(outcomes.is_empty());
    }
}
