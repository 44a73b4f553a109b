//! End-to-end runs of the scraper against a mock service.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use profile_scraper_core::config::FetchSettings;
use profile_scraper_core::fetch::{
    EscalationDecision, FixedDecision, HttpTransport, ResilientFetcher, RetryPolicy, build_client,
};
use profile_scraper_core::{
    Authenticator, Credentials, LoginRejected, LogoutOutcome, ProfileScraper, ScrapeError,
    TargetOutcome,
};
mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{endpoints_for, mount_root, profile_body};

fn scraper_for(server: &MockServer, decision: EscalationDecision) -> ProfileScraper {
    let client = build_client(&FetchSettings::default()).unwrap();
    let authenticator = Authenticator::new(client.clone(), endpoints_for(server));
    let fetcher = ResilientFetcher::new(HttpTransport::new(client), FixedDecision(decision));
    let policy = RetryPolicy::new(1, Duration::from_millis(5), Duration::from_millis(10));
    ProfileScraper::new(authenticator, fetcher, policy)
}

async fn mount_profile(server: &MockServer, username: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/{username}/")))
        .and(query_param("__a", "1"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_anonymous_run_reports_each_target() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    mount_profile(
        &mock_server,
        "alice",
        ResponseTemplate::new(200).set_body_json(profile_body("alice", 150)),
    )
    .await;
    mount_profile(&mock_server, "ghost", ResponseTemplate::new(404)).await;
    mount_profile(
        &mock_server,
        "odd",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"graphql": {}})),
    )
    .await;

    let summary = scraper_for(&mock_server, EscalationDecision::Abort)
        .run(&targets(&["alice", "ghost", "odd"]), None)
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.extracted(), 1);
    assert_eq!(summary.not_found(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.logout, LogoutOutcome::NotAuthenticated);

    let report = summary.reports().next().unwrap();
    assert_eq!(report.username(), "alice");
    assert_eq!(report.record().follower_count, 150);
    assert_eq!(report.record().post_count, 7);
    assert!(matches!(
        summary.results[2].outcome,
        TargetOutcome::ExtractionFailed(_)
    ));
}

#[tokio::test]
async fn test_abort_skips_remaining_targets() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    mount_profile(&mock_server, "broken", ResponseTemplate::new(502)).await;
    mount_profile(
        &mock_server,
        "later",
        ResponseTemplate::new(200).set_body_json(profile_body("later", 1)),
    )
    .await;

    let summary = scraper_for(&mock_server, EscalationDecision::Abort)
        .run(&targets(&["broken", "later"]), None)
        .await
        .unwrap();

    assert!(summary.was_aborted());
    assert!(matches!(summary.results[0].outcome, TargetOutcome::Aborted(_)));
    assert!(matches!(summary.results[1].outcome, TargetOutcome::Skipped));
    assert_eq!(summary.extracted(), 0);
}

#[tokio::test]
async fn test_ignore_continues_with_next_target() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    mount_profile(&mock_server, "broken", ResponseTemplate::new(502)).await;
    mount_profile(
        &mock_server,
        "later",
        ResponseTemplate::new(200).set_body_json(profile_body("later", 1)),
    )
    .await;

    let summary = scraper_for(&mock_server, EscalationDecision::Ignore)
        .run(&targets(&["broken", "later"]), None)
        .await
        .unwrap();

    assert!(!summary.was_aborted());
    assert!(matches!(summary.results[0].outcome, TargetOutcome::Ignored(_)));
    assert_eq!(summary.extracted(), 1);
}

#[tokio::test]
async fn test_authenticated_run_logs_out_at_end() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "csrftoken=login-token; Path=/")
                .set_body_json(serde_json::json!({"authenticated": true})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_profile(
        &mock_server,
        "alice",
        ResponseTemplate::new(200).set_body_json(profile_body("alice", 3)),
    )
    .await;

    let credentials = Credentials::new("me", "pw");
    let summary = scraper_for(&mock_server, EscalationDecision::Abort)
        .run(&targets(&["alice"]), Some(&credentials))
        .await
        .unwrap();

    assert!(summary.login_rejection.is_none());
    assert_eq!(summary.logout, LogoutOutcome::LoggedOut);
    assert_eq!(summary.extracted(), 1);
}

#[tokio::test]
async fn test_rejected_login_continues_anonymously() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "authenticated": false,
            "errors": {"error": ["bad password"]}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_profile(
        &mock_server,
        "alice",
        ResponseTemplate::new(200).set_body_json(profile_body("alice", 3)),
    )
    .await;

    let credentials = Credentials::new("me", "wrong");
    let summary = scraper_for(&mock_server, EscalationDecision::Abort)
        .run(&targets(&["alice"]), Some(&credentials))
        .await
        .unwrap();

    assert_eq!(
        summary.login_rejection,
        Some(LoginRejected::Errors(vec!["bad password".to_string()]))
    );
    assert_eq!(summary.logout, LogoutOutcome::NotAuthenticated);
    assert_eq!(summary.extracted(), 1);
}

#[tokio::test]
async fn test_missing_root_token_fails_run() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let result = scraper_for(&mock_server, EscalationDecision::Abort)
        .run(&targets(&["alice"]), None)
        .await;

    assert!(matches!(result, Err(ScrapeError::Auth(_))));
}

#[tokio::test]
async fn test_interrupt_tears_down_and_returns_error() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_root(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/ajax/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"authenticated": true})),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/logout/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_client(&FetchSettings::default()).unwrap();
    let fetcher = ResilientFetcher::new(
        HttpTransport::new(client.clone()),
        FixedDecision(EscalationDecision::Abort),
    );
    fetcher.interrupt().trigger();
    let scraper = ProfileScraper::new(
        Authenticator::new(client, endpoints_for(&mock_server)),
        fetcher,
        RetryPolicy::with_max_retries(0),
    );

    let result = scraper
        .run(&targets(&["alice"]), Some(&Credentials::new("me", "pw")))
        .await;

    assert!(matches!(
        result,
        Err(ScrapeError::Interrupted { completed: 0, .. })
    ));
}
