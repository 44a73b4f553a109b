//! Resilient HTTP fetching for JSON resources.
//!
//! This module turns one logical "fetch resource R" request into a
//! [`FetchOutcome`], hiding transient failures behind a [`RetryPolicy`].
//!
//! # Features
//!
//! - Doubling backoff between automatic retries (2s initial, 60s cap by default)
//! - Partial-body detection against the declared `Content-Length`
//! - 404 reported as [`FetchOutcome::NotFound`] without retries
//! - Pluggable [`Escalation`] once the retry budget is exhausted
//! - Interruptible backoff waits via [`InterruptSignal`]
//!
//! # Example
//!
//! ```no_run
//! use profile_scraper_core::config::ScraperConfig;
//! use profile_scraper_core::fetch::{
//!     EscalationDecision, FixedDecision, HttpTransport, ResilientFetcher, RetryPolicy,
//!     build_client,
//! };
//! use profile_scraper_core::Authenticator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::default();
//! let client = build_client(&config.fetch)?;
//! let authenticator = Authenticator::new(client.clone(), config.endpoints.clone());
//! let session = authenticator.establish_anonymous_session().await?;
//!
//! let fetcher = ResilientFetcher::new(
//!     HttpTransport::new(client),
//!     FixedDecision(EscalationDecision::Abort),
//! );
//! let policy = RetryPolicy::from_settings(&config.fetch);
//! let outcome = fetcher
//!     .fetch(&config.endpoints.profile_url("someone"), &session, &policy)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod escalation;
mod fetcher;
mod interrupt;
mod retry;
mod transport;

pub use error::{FailureType, FetchError, classify_error};
pub use escalation::{Escalation, EscalationDecision, FixedDecision, PolicyFn, TerminalPrompt};
pub use fetcher::{FetchOutcome, FetchedBody, ResilientFetcher, verify_content_length};
pub use interrupt::{InterruptSignal, Sleeper, TokioSleeper};
pub use retry::{RetryPolicy, RetryState};
pub use transport::{HttpTransport, RawResponse, Transport, build_client};
