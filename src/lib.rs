//! Profile Scraper Core Library
//!
//! Authenticated, failure-tolerant retrieval of profile metadata from an
//! Instagram-style web service.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Session store and the authenticator (anonymous login,
//!   credentialed login, logout)
//! - [`fetch`] - Resilient fetcher with backoff, partial-content detection
//!   and escalation once retries run out
//! - [`profile`] - Projection of profile responses into typed records
//! - [`scraper`] - Sequential run over a list of usernames
//! - [`config`] - Endpoints and fetch settings, with optional config file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod fetch;
pub mod profile;
pub mod scraper;
pub mod user_agent;

// Re-export commonly used types
pub use auth::{AuthError, Authenticator, LoginAttempt, LoginRejected, LogoutOutcome, Session};
pub use config::{ConfigError, ScraperConfig, ServiceEndpoints};
pub use fetch::{
    EscalationDecision, FetchError, FetchOutcome, HttpTransport, InterruptSignal,
    ResilientFetcher, RetryPolicy,
};
pub use profile::{ExtractionError, ProfileRecord, ProfileReport, extract};
pub use scraper::{Credentials, ProfileScraper, RunSummary, ScrapeError, TargetOutcome};
