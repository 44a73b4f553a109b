//! Decision point reached once automatic retries are exhausted.
//!
//! The fetcher hands the failing URL and cause to an [`Escalation`] and acts
//! on the returned [`EscalationDecision`]. Interactive runs use
//! [`TerminalPrompt`]; non-interactive callers plug in [`FixedDecision`] or
//! a [`PolicyFn`].

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tracing::{info, warn};

use super::FetchError;

/// Outcome chosen when automatic retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationDecision {
    /// Stop; the caller treats the resource as fatal.
    Abort,
    /// Stop; the caller skips the resource.
    Ignore,
    /// Reset the attempt count and backoff, then keep trying.
    Retry,
    /// Like [`Retry`](Self::Retry), and lift the retry budget for the rest of the run.
    RetryForever,
}

impl EscalationDecision {
    /// Interprets a prompt answer: the first character, case-insensitive.
    ///
    /// `A`, `I`, `R`, `F` map to the four decisions; anything else,
    /// including an empty answer, is [`Abort`](Self::Abort).
    #[must_use]
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('I') => Self::Ignore,
            Some('R') => Self::Retry,
            Some('F') => Self::RetryForever,
            _ => Self::Abort,
        }
    }
}

/// Pluggable escalation policy.
#[async_trait]
pub trait Escalation: Send + Sync {
    /// Chooses what to do about `cause` after the retry budget for `url` ran out.
    async fn decide(&self, url: &str, cause: &FetchError) -> EscalationDecision;
}

/// Always returns the same decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub EscalationDecision);

#[async_trait]
impl Escalation for FixedDecision {
    async fn decide(&self, url: &str, cause: &FetchError) -> EscalationDecision {
        debug_decision(url, cause, self.0);
        self.0
    }
}

/// Adapts a closure into an [`Escalation`].
pub struct PolicyFn<F>(pub F);

impl<F> std::fmt::Debug for PolicyFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PolicyFn")
    }
}

#[async_trait]
impl<F> Escalation for PolicyFn<F>
where
    F: Fn(&str, &FetchError) -> EscalationDecision + Send + Sync,
{
    async fn decide(&self, url: &str, cause: &FetchError) -> EscalationDecision {
        let decision = (self.0)(url, cause);
        debug_decision(url, cause, decision);
        decision
    }
}

fn debug_decision(url: &str, cause: &FetchError, decision: EscalationDecision) {
    tracing::debug!(url, error = %cause, ?decision, "escalation policy decided");
}

/// Asks the operator on the terminal.
///
/// The prompt goes to stderr; the answer is read from stdin on a blocking
/// thread. A closed or unreadable stdin counts as Abort.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl Escalation for TerminalPrompt {
    async fn decide(&self, url: &str, cause: &FetchError) -> EscalationDecision {
        let message = format!("Repeated error {cause}\n(A)bort, (I)gnore, (R)etry or retry (F)orever? ");
        let answer = tokio::task::spawn_blocking(move || read_answer(&message))
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        let decision = EscalationDecision::from_answer(&answer);
        match decision {
            EscalationDecision::Abort => warn!(url, "operator chose to abort"),
            EscalationDecision::Ignore => info!(url, "operator chose to ignore"),
            EscalationDecision::Retry => info!(url, "operator chose to retry"),
            EscalationDecision::RetryForever => info!(url, "operator chose to retry forever"),
        }
        decision
    }
}

fn read_answer(message: &str) -> Option<String> {
    let mut stderr = io::stderr().lock();
    stderr.write_all(message.as_bytes()).ok()?;
    stderr.flush().ok()?;
    drop(stderr);

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_answer_accepts_first_letter_case_insensitive() {
        assert_eq!(EscalationDecision::from_answer("a"), EscalationDecision::Abort);
        assert_eq!(EscalationDecision::from_answer("I"), EscalationDecision::Ignore);
        assert_eq!(EscalationDecision::from_answer("ignore\n"), EscalationDecision::Ignore);
        assert_eq!(EscalationDecision::from_answer("r"), EscalationDecision::Retry);
        assert_eq!(EscalationDecision::from_answer("Retry"), EscalationDecision::Retry);
        assert_eq!(EscalationDecision::from_answer("f"), EscalationDecision::RetryForever);
        assert_eq!(EscalationDecision::from_answer("Forever"), EscalationDecision::RetryForever);
    }

    #[test]
    fn test_from_answer_unknown_or_empty_is_abort() {
        assert_eq!(EscalationDecision::from_answer(""), EscalationDecision::Abort);
        assert_eq!(EscalationDecision::from_answer("\n"), EscalationDecision::Abort);
        assert_eq!(EscalationDecision::from_answer("yes"), EscalationDecision::Abort);
        assert_eq!(EscalationDecision::from_answer("x"), EscalationDecision::Abort);
    }

    #[tokio::test]
    async fn test_fixed_decision_returns_its_value() {
        let escalation = FixedDecision(EscalationDecision::Ignore);
        let cause = FetchError::timeout("https://example.com");
        assert_eq!(
            escalation.decide("https://example.com", &cause).await,
            EscalationDecision::Ignore
        );
    }

    #[tokio::test]
    async fn test_policy_fn_sees_cause() {
        let escalation = PolicyFn(|_: &str, cause: &FetchError| {
            if matches!(cause, FetchError::PartialContent { .. }) {
                EscalationDecision::Retry
            } else {
                EscalationDecision::Abort
            }
        });
        let partial = FetchError::partial_content("u", 500, 480);
        let timeout = FetchError::timeout("u");
        assert_eq!(escalation.decide("u", &partial).await, EscalationDecision::Retry);
        assert_eq!(escalation.decide("u", &timeout).await, EscalationDecision::Abort);
    }
}
