//! Retry policy with doubling backoff and an escalation threshold.
//!
//! A [`RetryPolicy`] is created once per run and lent to every fetch. It
//! owns the "retry forever" override: once an escalation chooses
//! [`RetryForever`](super::EscalationDecision::RetryForever) the automatic
//! budget is unlimited for every later fetch through the same policy.
//!
//! Each logical fetch keeps its own [`RetryState`]. Delays observed for one
//! fetch with the defaults are 2s, 4s, 8s before escalating:
//!
//! ```text
//! delay(n) = min(initial_delay * 2^n, max_delay)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, instrument};

use super::constants::{DEFAULT_MAX_RETRIES, DEFAULT_MAX_RETRY_DELAY, DEFAULT_RETRY_DELAY};
use crate::config::FetchSettings;

/// Backoff and escalation configuration shared by all fetches of a run.
#[derive(Debug)]
pub struct RetryPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
    unlimited: AtomicBool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_MAX_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy.
    ///
    /// `max_delay` is raised to `initial_delay` if smaller, so the delay
    /// sequence never decreases.
    #[must_use]
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            max_retries,
            unlimited: AtomicBool::new(false),
        }
    }

    /// Creates a policy with a custom budget, using default delays.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self::new(max_retries, DEFAULT_RETRY_DELAY, DEFAULT_MAX_RETRY_DELAY)
    }

    /// Creates a policy from resolved settings.
    #[must_use]
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self::new(
            settings.max_retries,
            settings.retry_delay,
            settings.max_retry_delay,
        )
    }

    /// Delay before the first automatic retry.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Backoff cap.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Automatic retries allowed before escalating.
    ///
    /// Returns `u32::MAX` once the budget was made unlimited.
    #[must_use]
    pub fn budget(&self) -> u32 {
        if self.is_unlimited() {
            u32::MAX
        } else {
            self.max_retries
        }
    }

    /// Whether a `RetryForever` escalation lifted the budget.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.unlimited.load(Ordering::SeqCst)
    }

    /// Lifts the automatic-retry budget for the rest of this policy's lifetime.
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn retry_forever(&self) {
        if !self.unlimited.swap(true, Ordering::SeqCst) {
            info!("automatic retry budget is now unlimited");
        }
    }

    /// Starts the per-fetch state for a new logical request.
    #[must_use]
    pub fn start(&self) -> RetryState {
        RetryState::new(self.initial_delay, self.max_delay)
    }
}

/// Attempt count and current delay for one logical fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    delay: Duration,
    initial_delay: Duration,
    cap: Duration,
}

impl RetryState {
    fn new(initial_delay: Duration, cap: Duration) -> Self {
        Self {
            attempt: 0,
            delay: initial_delay,
            initial_delay,
            cap,
        }
    }

    /// Automatic retries performed since the start or the last reset.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay to wait before the next retry.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Backoff cap.
    #[must_use]
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Whether another automatic retry fits in `budget`.
    #[must_use]
    pub fn can_retry(&self, budget: u32) -> bool {
        self.attempt < budget
    }

    /// Records a retry: doubles the delay (capped) and bumps the attempt count.
    pub fn advance(&mut self) {
        self.delay = self.delay.saturating_mul(2).min(self.cap);
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Returns to the initial delay with a zero attempt count.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.delay = self.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.budget(), 3);
        assert_eq!(policy.initial_delay(), Duration::from_secs(2));
        assert_eq!(policy.max_delay(), Duration::from_secs(60));
        assert!(!policy.is_unlimited());
    }

    #[test]
    fn test_retry_policy_cap_never_below_initial() {
        let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(1));
        assert_eq!(policy.max_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_retry_forever_lifts_budget_permanently() {
        let policy = RetryPolicy::with_max_retries(2);
        policy.retry_forever();
        assert_eq!(policy.budget(), u32::MAX);
        // Idempotent and never cleared.
        policy.retry_forever();
        assert!(policy.is_unlimited());
        let _ = policy.start();
        assert_eq!(policy.budget(), u32::MAX);
    }

    #[test]
    fn test_state_doubles_delay_until_cap() {
        let policy = RetryPolicy::new(10, Duration::from_secs(2), Duration::from_secs(10));
        let mut state = policy.start();
        let mut observed = Vec::new();
        for _ in 0..5 {
            observed.push(state.delay());
            state.advance();
        }
        assert_eq!(
            observed,
            [2, 4, 8, 10, 10].map(Duration::from_secs).to_vec()
        );
        assert_eq!(state.attempt(), 5);
    }

    #[test]
    fn test_state_delay_is_monotonic() {
        let policy = RetryPolicy::new(100, Duration::from_millis(300), Duration::from_secs(60));
        let mut state = policy.start();
        let mut previous = state.delay();
        for _ in 0..64 {
            state.advance();
            assert!(state.delay() >= previous);
            assert!(state.delay() <= state.cap());
            previous = state.delay();
        }
    }

    #[test]
    fn test_state_budget_check() {
        let policy = RetryPolicy::with_max_retries(2);
        let mut state = policy.start();
        assert!(state.can_retry(policy.budget()));
        state.advance();
        assert!(state.can_retry(policy.budget()));
        state.advance();
        assert!(!state.can_retry(policy.budget()));
    }

    #[test]
    fn test_state_reset_restores_initial_values() {
        let policy = RetryPolicy::default();
        let mut state = policy.start();
        state.advance();
        state.advance();
        state.reset();
        assert_eq!(state, policy.start());
    }

    #[test]
    fn test_zero_budget_escalates_immediately() {
        let policy = RetryPolicy::with_max_retries(0);
        assert!(!policy.start().can_retry(policy.budget()));
    }
}
