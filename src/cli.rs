//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use profile_scraper_core::EscalationDecision;
use profile_scraper_core::fetch::constants::MAX_RETRIES_LIMIT;

/// Fetch profile metadata for one or more usernames.
///
/// Each profile is printed as JSON on stdout, or saved as
/// `<DESTINATION>/<username>.json` when a destination is given.
#[derive(Parser, Debug)]
#[command(name = "profile-scraper")]
#[command(author, version, about)]
pub struct Args {
    /// Usernames to scrape
    pub usernames: Vec<String>,

    /// Login user name (requires --login-pass)
    #[arg(short = 'u', long, requires = "login_pass")]
    pub login_user: Option<String>,

    /// Login password (requires --login-user)
    #[arg(short = 'p', long, requires = "login_user")]
    pub login_pass: Option<String>,

    /// Directory to save reports into instead of printing them
    #[arg(short = 'd', long)]
    pub destination: Option<PathBuf>,

    /// Automatic retries before escalating (0-20, overrides the config file)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETRIES_LIMIT)))]
    pub max_retries: Option<u32>,

    /// What to do once automatic retries are exhausted
    #[arg(long, value_enum, default_value_t = ExhaustedAction::Prompt)]
    pub on_exhausted: ExhaustedAction,

    /// Service root URL (login, logout and profile URLs derive from it)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Escalation behavior selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExhaustedAction {
    /// Ask on the terminal each time
    Prompt,
    /// Stop the run
    Abort,
    /// Skip the failing profile
    Ignore,
    /// Start another round of retries
    Retry,
    /// Stop escalating and retry without limit
    RetryForever,
}

impl ExhaustedAction {
    /// The fixed decision for non-interactive actions, `None` for `Prompt`.
    pub fn decision(self) -> Option<EscalationDecision> {
        match self {
            Self::Prompt => None,
            Self::Abort => Some(EscalationDecision::Abort),
            Self::Ignore => Some(EscalationDecision::Ignore),
            Self::Retry => Some(EscalationDecision::Retry),
            Self::RetryForever => Some(EscalationDecision::RetryForever),
        }
    }
}
