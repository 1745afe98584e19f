/*!
 * Creation Retry Policy
 * Bounded retry of native region creation on transient statuses
 */

use super::native::NativeStatus;
use log::warn;

/// Retries allowed after the first creation attempt
pub const MAX_CREATE_RETRIES: u32 = 5;

/// Retry policy for native creation
///
/// Only statuses accepted by `is_retryable` cause another attempt; any other
/// failure ends the loop immediately with that status.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub is_retryable: fn(&NativeStatus) -> bool,
}

fn interrupted_only(status: &NativeStatus) -> bool {
    matches!(status, NativeStatus::CreateInterrupted)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_CREATE_RETRIES,
            is_retryable: interrupted_only,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Total attempts the policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `attempt` until it succeeds, fails terminally, or retries run out
    ///
    /// `attempt` receives the zero-based attempt number.
    pub fn run<T, F>(&self, mut attempt: F) -> Result<T, NativeStatus>
    where
        F: FnMut(u32) -> Result<T, NativeStatus>,
    {
        let mut last = NativeStatus::CreateInterrupted;
        for i in 0..self.max_attempts() {
            match attempt(i) {
                Ok(value) => return Ok(value),
                Err(status) => {
                    warn!("Failed to create an enclave, attempt={}, status={}", i, status);
                    if !(self.is_retryable)(&status) {
                        return Err(status);
                    }
                    last = status;
                }
            }
        }
        Err(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scripted(outcomes: Vec<NativeStatus>) -> impl FnMut(u32) -> Result<u32, NativeStatus> {
        let mut outcomes = outcomes.into_iter();
        move |i| match outcomes.next() {
            Some(NativeStatus::Success) | None => Ok(i),
            Some(status) => Err(status),
        }
    }

    #[test]
    fn test_sixth_interrupted_outcome_fails() {
        let policy = RetryPolicy::default();
        let result = policy.run(scripted(vec![NativeStatus::CreateInterrupted; 6]));
        assert_eq!(result, Err(NativeStatus::CreateInterrupted));
    }

    #[test]
    fn test_sixth_success_outcome_succeeds() {
        let policy = RetryPolicy::default();
        let mut outcomes = vec![NativeStatus::CreateInterrupted; 5];
        outcomes.push(NativeStatus::Success);
        assert_eq!(policy.run(scripted(outcomes)), Ok(5));
    }

    #[test]
    fn test_terminal_status_stops_immediately() {
        let policy = RetryPolicy::default();
        let mut calls = 0;
        let result: Result<(), _> = policy.run(|_| {
            calls += 1;
            Err(NativeStatus::Failure(0x3001))
        });
        assert_eq!(result, Err(NativeStatus::Failure(0x3001)));
        assert_eq!(calls, 1);
    }

    proptest! {
        #[test]
        fn prop_attempts_never_exceed_bound(interrupted in 0u32..12, max_retries in 0u32..8) {
            let policy = RetryPolicy::default().with_max_retries(max_retries);
            let mut calls = 0u32;
            let result = policy.run(|_| {
                calls += 1;
                if calls <= interrupted {
                    Err(NativeStatus::CreateInterrupted)
                } else {
                    Ok(())
                }
            });
            prop_assert!(calls <= policy.max_attempts());
            prop_assert_eq!(result.is_ok(), interrupted < policy.max_attempts());
        }
    }
}
