//! CLI entry point for the profile scraper.

use anyhow::{Context, Result, bail};
use clap::Parser;
use profile_scraper_core::config::{ScraperConfig, load_default_file_config, load_file_config};
use profile_scraper_core::fetch::{FixedDecision, TerminalPrompt, build_client};
use profile_scraper_core::scraper::save_report;
use profile_scraper_core::{
    Authenticator, Credentials, HttpTransport, InterruptSignal, LoginRejected, LogoutOutcome,
    ProfileScraper, ResilientFetcher, RetryPolicy, RunSummary, ScrapeError, TargetOutcome,
};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

/// Conventional exit status for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Reports go to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        usernames = ?args.usernames,
        login_user = ?args.login_user,
        on_exhausted = ?args.on_exhausted,
        "CLI arguments parsed"
    );

    if args.usernames.is_empty() {
        info!("No usernames provided. Pass one or more usernames as arguments.");
        info!("Example: profile-scraper instagram -d ./profiles");
        return Ok(());
    }

    let config = resolve_config(&args)?;
    debug!(?config, "configuration resolved");

    let client = build_client(&config.fetch).context("failed to build HTTP client")?;
    let authenticator = Authenticator::new(client.clone(), config.endpoints.clone());

    let interrupt = InterruptSignal::new();
    interrupt.install_ctrl_c_handler();

    let transport = HttpTransport::new(client);
    let fetcher = match args.on_exhausted.decision() {
        Some(decision) => ResilientFetcher::new(transport, FixedDecision(decision)),
        None => ResilientFetcher::new(transport, TerminalPrompt),
    }
    .with_interrupt(interrupt);

    let scraper = ProfileScraper::new(
        authenticator,
        fetcher,
        RetryPolicy::from_settings(&config.fetch),
    );

    let credentials = match (&args.login_user, &args.login_pass) {
        (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
        _ => None,
    };

    info!(targets = args.usernames.len(), "Profile scraper starting");
    let summary = match scraper.run(&args.usernames, credentials.as_ref()).await {
        Ok(summary) => summary,
        Err(error @ ScrapeError::Interrupted { .. }) => {
            // The session is already torn down; a prompt may still block on stdin.
            error!(%error, "Interrupted");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        Err(error) => return Err(error.into()),
    };

    if let Some(rejection) = &summary.login_rejection {
        report_login_rejection(rejection);
    }
    emit_reports(&summary, &args).await?;
    report_outcomes(&summary);

    info!(
        extracted = summary.extracted(),
        not_found = summary.not_found(),
        failed = summary.failed(),
        skipped = summary.skipped(),
        "Scrape complete"
    );

    if summary.was_aborted() {
        bail!("run aborted after retries were exhausted");
    }
    Ok(())
}

/// Defaults, then the config file, then CLI overrides.
fn resolve_config(args: &Args) -> Result<ScraperConfig> {
    let file = match &args.config {
        Some(path) => Some(
            load_file_config(path)?
                .with_context(|| format!("config file not found: {}", path.display()))?,
        ),
        None => load_default_file_config()?,
    };

    if let Some(base_url) = &args.base_url {
        url::Url::parse(base_url).with_context(|| format!("invalid --base-url {base_url}"))?;
    }
    let mut config = ScraperConfig::resolve(file.as_ref(), args.base_url.as_deref());
    if let Some(max_retries) = args.max_retries {
        config.fetch.max_retries = max_retries;
    }
    Ok(config)
}

async fn emit_reports(summary: &RunSummary, args: &Args) -> Result<()> {
    for report in summary.reports() {
        match &args.destination {
            Some(dir) => {
                let path = save_report(dir, report)
                    .await
                    .with_context(|| format!("failed to save report for {}", report.username()))?;
                info!(path = %path.display(), "Saved profile");
            }
            None => println!("{}", serde_json::to_string_pretty(report)?),
        }
    }
    Ok(())
}

fn report_outcomes(summary: &RunSummary) {
    for result in &summary.results {
        let username = result.username.as_str();
        match &result.outcome {
            TargetOutcome::Extracted(_) | TargetOutcome::Skipped => {}
            TargetOutcome::NotFound => warn!(username, "Profile not found"),
            TargetOutcome::Ignored(cause) => warn!(username, error = %cause, "Ignored after repeated errors"),
            TargetOutcome::Aborted(cause) => warn!(username, error = %cause, "Aborted after repeated errors"),
            TargetOutcome::FetchFailed(error) => warn!(username, error = %error, "Fetch failed"),
            TargetOutcome::ExtractionFailed(error) => {
                warn!(username, error = %error, "Unexpected profile response");
            }
        }
    }
    if let LogoutOutcome::Failed(reason) = &summary.logout {
        warn!(%reason, "Logout did not complete");
    }
}

fn report_login_rejection(rejection: &LoginRejected) {
    match rejection {
        LoginRejected::CheckpointRequired { verify_url, .. } => {
            warn!("Login requires verification. Please verify your account at {verify_url}");
        }
        _ => warn!(%rejection, "Login failed; continuing without authentication"),
    }
}
