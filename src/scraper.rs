//! Sequential scrape of profile metadata for a list of usernames.
//!
//! One session is established up front, every target is fetched and
//! extracted in order through it, and the session is torn down at the end
//! whatever happened in between.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::auth::{AuthError, Authenticator, LoginRejected, LogoutOutcome, Session};
use crate::fetch::{FetchError, FetchOutcome, HttpTransport, ResilientFetcher, RetryPolicy, Transport};
use crate::profile::{ExtractionError, ProfileReport, extract};

/// Login credentials for an authenticated run.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What happened to one target.
#[derive(Debug)]
pub enum TargetOutcome {
    /// The profile was fetched and projected.
    Extracted(ProfileReport),
    /// The service has no such profile.
    NotFound,
    /// Retries ran out and escalation skipped this target.
    Ignored(FetchError),
    /// Retries ran out and escalation stopped the run at this target.
    Aborted(FetchError),
    /// The request could not be attempted (malformed URL).
    FetchFailed(FetchError),
    /// The body did not have the expected profile shape.
    ExtractionFailed(ExtractionError),
    /// Not attempted because an earlier target aborted the run.
    Skipped,
}

impl TargetOutcome {
    /// Short label used in logs and the run summary.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Extracted(_) => "extracted",
            Self::NotFound => "not_found",
            Self::Ignored(_) => "ignored",
            Self::Aborted(_) => "aborted",
            Self::FetchFailed(_) => "fetch_failed",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One target and its outcome.
#[derive(Debug)]
pub struct TargetResult {
    pub username: String,
    pub outcome: TargetOutcome,
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Per-target outcomes, in input order.
    pub results: Vec<TargetResult>,
    /// Set when credentials were supplied but refused.
    pub login_rejection: Option<LoginRejected>,
    /// How the session teardown went.
    pub logout: LogoutOutcome,
}

impl RunSummary {
    /// Reports for every extracted target.
    pub fn reports(&self) -> impl Iterator<Item = &ProfileReport> {
        self.results.iter().filter_map(|result| match &result.outcome {
            TargetOutcome::Extracted(report) => Some(report),
            _ => None,
        })
    }

    #[must_use]
    pub fn extracted(&self) -> usize {
        self.reports().count()
    }

    #[must_use]
    pub fn not_found(&self) -> usize {
        self.count(|outcome| matches!(outcome, TargetOutcome::NotFound))
    }

    /// Targets that were attempted but produced no report.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                TargetOutcome::Ignored(_)
                    | TargetOutcome::Aborted(_)
                    | TargetOutcome::FetchFailed(_)
                    | TargetOutcome::ExtractionFailed(_)
            )
        })
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, TargetOutcome::Skipped))
    }

    /// Whether escalation stopped the run early.
    #[must_use]
    pub fn was_aborted(&self) -> bool {
        self.count(|outcome| matches!(outcome, TargetOutcome::Aborted(_))) > 0
    }

    fn count(&self, predicate: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.results.iter().filter(|result| predicate(&result.outcome)).count()
    }
}

/// A run could not complete.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No session could be established.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The run was interrupted; the session was torn down first.
    #[error("run interrupted after {completed} target(s): {source}")]
    Interrupted {
        /// Targets finished before the interrupt.
        completed: usize,
        #[source]
        source: FetchError,
    },
}

/// Drives authentication, fetching and extraction for a list of targets.
pub struct ProfileScraper<T = HttpTransport> {
    authenticator: Authenticator,
    fetcher: ResilientFetcher<T>,
    policy: RetryPolicy,
}

impl<T: Transport> ProfileScraper<T> {
    #[must_use]
    pub fn new(authenticator: Authenticator, fetcher: ResilientFetcher<T>, policy: RetryPolicy) -> Self {
        Self {
            authenticator,
            fetcher,
            policy,
        }
    }

    /// The retry policy shared by every fetch in a run.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Scrapes `targets` in order.
    ///
    /// With credentials a login is attempted first; a refused login is
    /// recorded in the summary and the run continues with the
    /// unauthenticated session. An aborting escalation marks the remaining
    /// targets as skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Auth`] when no session can be established and
    /// [`ScrapeError::Interrupted`] when the interrupt signal fires. The
    /// session is torn down before an interrupt is returned.
    #[instrument(skip(self, targets, credentials), fields(targets = targets.len()))]
    pub async fn run(
        &self,
        targets: &[String],
        credentials: Option<&Credentials>,
    ) -> Result<RunSummary, ScrapeError> {
        let (mut session, login_rejection) = match credentials {
            Some(credentials) => {
                let attempt = self
                    .authenticator
                    .establish_authenticated_session(&credentials.username, &credentials.password)
                    .await?;
                (attempt.session, attempt.rejection)
            }
            None => (self.authenticator.establish_anonymous_session().await?, None),
        };

        let mut results = Vec::with_capacity(targets.len());
        let mut interrupted = None;
        let mut aborted = false;

        for username in targets {
            if aborted {
                results.push(TargetResult {
                    username: username.clone(),
                    outcome: TargetOutcome::Skipped,
                });
                continue;
            }

            match self.scrape_target(&session, username).await {
                Ok(outcome) => {
                    info!(username = %username, outcome = outcome.label(), "target finished");
                    aborted = matches!(outcome, TargetOutcome::Aborted(_));
                    results.push(TargetResult {
                        username: username.clone(),
                        outcome,
                    });
                }
                Err(error @ FetchError::Interrupted { .. }) => {
                    warn!(username = %username, "interrupted");
                    interrupted = Some(error);
                    break;
                }
                Err(error) => {
                    warn!(username = %username, error = %error, "fetch failed");
                    results.push(TargetResult {
                        username: username.clone(),
                        outcome: TargetOutcome::FetchFailed(error),
                    });
                }
            }
        }

        let logout = self.authenticator.teardown(&mut session).await;

        if let Some(source) = interrupted {
            return Err(ScrapeError::Interrupted {
                completed: results.len(),
                source,
            });
        }

        Ok(RunSummary {
            results,
            login_rejection,
            logout,
        })
    }

    async fn scrape_target(&self, session: &Session, username: &str) -> Result<TargetOutcome, FetchError> {
        let url = self.authenticator.endpoints().profile_url(username);
        let outcome = match self.fetcher.fetch(&url, session, &self.policy).await? {
            FetchOutcome::Success(fetched) => match extract(&fetched.body, username) {
                Ok(record) => TargetOutcome::Extracted(ProfileReport::new(username, record)),
                Err(error) => {
                    warn!(username, error = %error, "could not extract profile");
                    TargetOutcome::ExtractionFailed(error)
                }
            },
            FetchOutcome::NotFound => TargetOutcome::NotFound,
            FetchOutcome::Ignored(cause) => TargetOutcome::Ignored(cause),
            FetchOutcome::Aborted(cause) => TargetOutcome::Aborted(cause),
        };
        Ok(outcome)
    }
}

/// Writes `report` as pretty JSON to `<dir>/<username>.json`.
///
/// The directory is created if missing. Path separators in the username are
/// replaced so the file always lands directly inside `dir`.
///
/// # Errors
///
/// Returns the I/O error if the directory or file cannot be written.
pub async fn save_report(dir: &Path, report: &ProfileReport) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", report_file_stem(report.username())));
    let json = serde_json::to_vec_pretty(report).map_err(std::io::Error::other)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

fn report_file_stem(username: &str) -> String {
    let stem: String = username
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => format!("_{stem}"),
        _ => stem,
    }
}
