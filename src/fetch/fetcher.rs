//! Retrying fetch of one logical resource.
//!
//! ```text
//! START -> ISSUING -> SUCCESS | NOT_FOUND
//!          ISSUING -> FAILED -> WAITING -> ISSUING
//!                     FAILED -> ESCALATING -> ABORTED | IGNORED
//!                               ESCALATING -> WAITING (reset) -> ISSUING
//! ```
//!
//! An interrupt raised at any point (before issuing, while a request is in
//! flight, while waiting, or while escalation is deciding) unwinds the whole
//! fetch with [`FetchError::Interrupted`].

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::escalation::{Escalation, EscalationDecision};
use super::interrupt::{InterruptSignal, Sleeper, TokioSleeper};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, RawResponse, Transport};
use super::FetchError;
use crate::auth::Session;

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    /// HTTP status code (2xx).
    pub status: u16,
    /// Complete body.
    pub body: Vec<u8>,
    /// Failed attempts that preceded this success.
    pub retries: u32,
}

/// Result of one logical fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The resource was retrieved.
    Success(FetchedBody),
    /// The service answered 404.
    NotFound,
    /// Escalation chose to abort; the caller should stop.
    Aborted(FetchError),
    /// Escalation chose to skip this resource.
    Ignored(FetchError),
}

impl FetchOutcome {
    /// Returns the body on success.
    #[must_use]
    pub fn into_body(self) -> Option<FetchedBody> {
        match self {
            Self::Success(body) => Some(body),
            _ => None,
        }
    }
}

enum Attempt {
    Success(RawResponse),
    NotFound,
}

/// Issues GETs through a session and hides transient failures behind a
/// [`RetryPolicy`] and an [`Escalation`].
pub struct ResilientFetcher<T = HttpTransport> {
    transport: T,
    escalation: Box<dyn Escalation>,
    sleeper: Box<dyn Sleeper>,
    interrupt: InterruptSignal,
}

impl<T: Transport> ResilientFetcher<T> {
    /// Creates a fetcher that sleeps on the tokio timer and has its own
    /// interrupt signal.
    pub fn new(transport: T, escalation: impl Escalation + 'static) -> Self {
        Self {
            transport,
            escalation: Box::new(escalation),
            sleeper: Box::new(TokioSleeper),
            interrupt: InterruptSignal::new(),
        }
    }

    /// Replaces the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Shares an existing interrupt signal.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptSignal) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The interrupt signal observed by this fetcher.
    #[must_use]
    pub fn interrupt(&self) -> &InterruptSignal {
        &self.interrupt
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches `url` through `session`, retrying per `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Interrupted`] when the interrupt signal fires and
    /// [`FetchError::InvalidUrl`] for malformed URLs. Every other failure is
    /// absorbed by the retry policy and surfaces as
    /// [`FetchOutcome::Aborted`] or [`FetchOutcome::Ignored`].
    #[instrument(skip(self, session, policy), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        session: &Session,
        policy: &RetryPolicy,
    ) -> Result<FetchOutcome, FetchError> {
        let mut state = policy.start();
        let mut retries = 0u32;

        loop {
            if self.interrupt.is_triggered() {
                return Err(FetchError::interrupted(url));
            }

            let attempt = tokio::select! {
                biased;
                () = self.interrupt.triggered() => {
                    warn!(url, "interrupted during request");
                    return Err(FetchError::interrupted(url));
                }
                result = self.attempt(url, session) => result,
            };
            let cause = match attempt {
                Ok(Attempt::Success(response)) => {
                    debug!(retries, bytes = response.body.len(), "fetch succeeded");
                    return Ok(FetchOutcome::Success(FetchedBody {
                        status: response.status,
                        body: response.body,
                        retries,
                    }));
                }
                Ok(Attempt::NotFound) => {
                    info!("resource not found");
                    return Ok(FetchOutcome::NotFound);
                }
                Err(error) if error.is_retryable() => error,
                Err(error) => return Err(error),
            };
            retries = retries.saturating_add(1);

            let budget = policy.budget();
            if state.can_retry(budget) {
                warn!(
                    attempt = state.attempt() + 1,
                    budget,
                    delay_ms = state.delay().as_millis(),
                    error = %cause,
                    "retrying after failure"
                );
                self.wait(url, state.delay()).await?;
                state.advance();
                continue;
            }

            warn!(attempts = state.attempt(), error = %cause, "retries exhausted, escalating");
            let decision = tokio::select! {
                biased;
                () = self.interrupt.triggered() => {
                    warn!(url, "interrupted while escalating");
                    return Err(FetchError::interrupted(url));
                }
                decision = self.escalation.decide(url, &cause) => decision,
            };
            match decision {
                EscalationDecision::Abort => return Ok(FetchOutcome::Aborted(cause)),
                EscalationDecision::Ignore => return Ok(FetchOutcome::Ignored(cause)),
                EscalationDecision::Retry => state.reset(),
                EscalationDecision::RetryForever => {
                    policy.retry_forever();
                    state.reset();
                }
            }
            self.wait(url, state.delay()).await?;
        }
    }

    async fn attempt(&self, url: &str, session: &Session) -> Result<Attempt, FetchError> {
        let response = self.transport.get(url, session).await?;
        if response.status == 404 {
            return Ok(Attempt::NotFound);
        }
        if !(200..300).contains(&response.status) {
            return Err(FetchError::http_status(url, response.status));
        }
        verify_content_length(url, response.declared_length, response.body.len())?;
        Ok(Attempt::Success(response))
    }

    async fn wait(&self, url: &str, delay: Duration) -> Result<(), FetchError> {
        tokio::select! {
            biased;
            () = self.interrupt.triggered() => {
                warn!(url, "interrupted during retry wait");
                Err(FetchError::interrupted(url))
            }
            () = self.sleeper.sleep(delay) => Ok(()),
        }
    }
}

/// Checks the received byte count against the declared `Content-Length`.
///
/// Guards against servers that drop the connection mid-body without a
/// transport-level error. No declared length means nothing to check.
///
/// # Errors
///
/// Returns [`FetchError::PartialContent`] on mismatch.
pub fn verify_content_length(
    url: &str,
    declared: Option<u64>,
    received: usize,
) -> Result<(), FetchError> {
    let received = received as u64;
    match declared {
        Some(expected) if expected != received => {
            Err(FetchError::partial_content(url, expected, received))
        }
        _ => Ok(()),
    }
}
