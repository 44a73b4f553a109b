//! Constants for the fetch module (timeouts, backoff, retry budget).

use std::time::Duration;

/// Default HTTP connect timeout (90 seconds; the service is slow to accept under load).
pub const CONNECT_TIMEOUT_SECS: u64 = 90;

/// Default HTTP read timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Initial backoff delay before the first automatic retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Upper bound for the doubling backoff delay.
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Automatic retries performed before escalating.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Largest accepted retry budget, from the command line or the config file.
pub const MAX_RETRIES_LIMIT: u32 = 20;
