//! Bounded retry policy
//!
//! Both the crawler's stale-element reads and the extractor's inference
//! calls retry through a `RetryPolicy`, so their limits live in one place.
//!
//! | Use | Attempts | Backoff |
//! |-----|----------|---------|
//! | Block text read | 3 | fixed 500ms |
//! | Extraction | `retry-attempts` (default 1) | none |

use std::future::Future;
use std::time::Duration;

/// Delay applied between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Wait the same duration before every retry
    Fixed(Duration),
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(d) => d,
        }
    }
}

/// What a failed attempt means for the remaining budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Try again if attempts remain
    Retry,
    /// Give up immediately
    Abort,
}

/// Result of running an operation under a policy
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Maximum attempts plus a backoff function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Runs `op` until it succeeds, the budget is spent, or `classify`
    /// returns [`Verdict::Abort`] for an error
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, C>(&self, mut op: F, classify: C) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> Verdict,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) => {
                    if attempt >= self.max_attempts || classify(&e) == Verdict::Abort {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }
                    let delay = self.backoff.delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_stops_at_max_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Backoff::None);

        let outcome: RetryOutcome<(), &str> = policy
            .run(
                |_| {
                    calls.set(calls.get() + 1);
                    async { Err("boom") }
                },
                |_| Verdict::Retry,
            )
            .await;

        assert_eq!(calls.get(), 3);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let policy = RetryPolicy::new(5, Backoff::None);

        let outcome: RetryOutcome<u32, &str> = policy
            .run(
                |attempt| async move {
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(attempt)
                    }
                },
                |_| Verdict::Retry,
            )
            .await;

        assert_eq!(outcome.result, Ok(2));
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_abort_skips_remaining_budget() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Backoff::None);

        let outcome: RetryOutcome<(), &str> = policy
            .run(
                |_| {
                    calls.set(calls.get() + 1);
                    async { Err("fatal") }
                },
                |_| Verdict::Abort,
            )
            .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Backoff::None).max_attempts(), 1);
    }

    #[test]
    fn test_backoff_delays() {
        let fixed = Backoff::Fixed(Duration::from_millis(500));
        assert_eq!(fixed.delay(), Duration::from_millis(500));
        assert_eq!(Backoff::None.delay(), Duration::ZERO);
    }
}
