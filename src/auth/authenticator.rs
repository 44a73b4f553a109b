//! Session establishment and teardown against the service.

use std::collections::BTreeMap;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use super::error::{AuthError, LoginRejected};
use super::session::{CSRF_COOKIE, Session};
use crate::config::ServiceEndpoints;
use crate::user_agent::{BROWSER_USER_AGENT, STORIES_USER_AGENT};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Result of a credentialed login.
///
/// The session is returned even when the login was rejected so callers can
/// inspect it (cookies, token) or fall back to anonymous use.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// The session, authenticated only when `rejection` is `None`.
    pub session: Session,
    /// Why the service refused the credentials, if it did.
    pub rejection: Option<LoginRejected>,
}

impl LoginAttempt {
    /// Whether the credentials were accepted.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

/// What happened during [`Authenticator::teardown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The session was never authenticated; no request was sent.
    NotAuthenticated,
    /// The service acknowledged the logout.
    LoggedOut,
    /// The logout request failed. The session is still marked logged out.
    Failed(String),
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    authenticated: Option<bool>,
    #[serde(default)]
    checkpoint_url: Option<String>,
    #[serde(default)]
    errors: Option<LoginErrors>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginErrors {
    #[serde(default)]
    error: Vec<String>,
}

/// Establishes and tears down sessions.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: Client,
    endpoints: ServiceEndpoints,
}

impl Authenticator {
    /// Creates an authenticator that talks to `endpoints` with `client`.
    #[must_use]
    pub fn new(client: Client, endpoints: ServiceEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// The endpoints this authenticator talks to.
    #[must_use]
    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Creates an anonymous session carrying a fresh anti-forgery token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the service root cannot be reached or does
    /// not set the anti-forgery cookie.
    #[instrument(skip(self), fields(base_url = %self.endpoints.base_url))]
    pub async fn establish_anonymous_session(&self) -> Result<Session, AuthError> {
        let session = self.bootstrap().await?;
        info!("anonymous session established");
        Ok(session)
    }

    /// Logs in with credentials.
    ///
    /// A rejected login is not an error: the returned [`LoginAttempt`]
    /// carries the [`LoginRejected`] reason and an unauthenticated session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the token bootstrap fails or the login
    /// request cannot be completed at the network level.
    #[instrument(skip(self, password), fields(login_url = %self.endpoints.login_url))]
    pub async fn establish_authenticated_session(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginAttempt, AuthError> {
        let mut session = self.bootstrap().await?;

        let login_url = self.endpoints.login_url.as_str();
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        let response = self
            .form_post(&session, login_url, body)
            .send()
            .await
            .map_err(|e| AuthError::network("login", login_url, e))?;

        let status = response.status().as_u16();
        let cookies = response_cookies(&response);
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::network("login", login_url, e))?;

        for (name, value) in &cookies {
            session.set_cookie(name, value);
        }
        if let Some(token) = cookies.get(CSRF_COOKIE) {
            session.install_csrf_token(token);
        }

        let rejection = match classify_login(status, &text, &self.endpoints) {
            Ok(()) => {
                if !cookies.contains_key(CSRF_COOKIE) {
                    warn!("login response did not rotate the anti-forgery token; keeping bootstrap token");
                }
                session.set_authenticated(true);
                info!(username, "logged in");
                None
            }
            Err(rejection) => {
                report_rejection(username, &rejection);
                Some(rejection)
            }
        };

        Ok(LoginAttempt { session, rejection })
    }

    /// Logs out an authenticated session.
    ///
    /// Never fails: the authenticated flag is cleared whatever happens and a
    /// failed logout request is reported through [`LogoutOutcome::Failed`].
    #[instrument(skip(self, session), fields(logout_url = %self.endpoints.logout_url))]
    pub async fn teardown(&self, session: &mut Session) -> LogoutOutcome {
        if !session.is_authenticated() {
            debug!("session not authenticated; skipping logout");
            return LogoutOutcome::NotAuthenticated;
        }

        let logout_url = self.endpoints.logout_url.as_str();
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("csrfmiddlewaretoken", session.csrf_token().unwrap_or_default())
            .finish();
        let result = self.form_post(session, logout_url, body).send().await;
        session.set_authenticated(false);

        let outcome = match result {
            Ok(response) if response.status().is_success() => LogoutOutcome::LoggedOut,
            Ok(response) => LogoutOutcome::Failed(format!("HTTP {}", response.status().as_u16())),
            Err(error) => LogoutOutcome::Failed(error.to_string()),
        };
        match &outcome {
            LogoutOutcome::Failed(reason) => warn!(%reason, "failed to log out"),
            _ => info!("logged out"),
        }
        outcome
    }

    /// Fetches the service root as the mobile client to obtain the
    /// anti-forgery token, then reverts to the browser identity.
    async fn bootstrap(&self) -> Result<Session, AuthError> {
        let base_url = self.endpoints.base_url.as_str();
        let mut session = Session::new();
        session.set_header("user-agent", BROWSER_USER_AGENT);
        session.set_header("referer", base_url);
        session.set_header("user-agent", STORIES_USER_AGENT);

        let response = session
            .apply(self.client.get(base_url))
            .send()
            .await
            .map_err(|e| AuthError::network("bootstrap", base_url, e))?;
        let cookies = response_cookies(&response);
        debug!(
            status = response.status().as_u16(),
            cookies = cookies.len(),
            "service root fetched"
        );

        let token = cookies
            .get(CSRF_COOKIE)
            .cloned()
            .ok_or_else(|| AuthError::MissingCsrfToken {
                url: base_url.to_string(),
                cookie: CSRF_COOKIE,
            })?;
        for (name, value) in cookies {
            session.set_cookie(name, value);
        }
        session.install_csrf_token(token);
        session.set_header("user-agent", BROWSER_USER_AGENT);
        Ok(session)
    }

    fn form_post(&self, session: &Session, url: &str, body: String) -> RequestBuilder {
        session
            .apply(self.client.post(url))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
    }
}

fn response_cookies(response: &Response) -> BTreeMap<String, String> {
    response
        .cookies()
        .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
        .collect()
}

/// Decides whether a login response means success.
///
/// Success requires HTTP 200 and `"authenticated": true`. Failures are
/// checked in order: checkpoint, listed errors, anything else.
fn classify_login(status: u16, body: &str, endpoints: &ServiceEndpoints) -> Result<(), LoginRejected> {
    let Ok(parsed) = serde_json::from_str::<LoginResponse>(body) else {
        return Err(LoginRejected::Unrecognized(body.to_string()));
    };

    if parsed.authenticated == Some(true) && status == 200 {
        return Ok(());
    }
    if let Some(checkpoint_url) = parsed.checkpoint_url {
        let verify_url = endpoints.absolute_url(&checkpoint_url);
        return Err(LoginRejected::CheckpointRequired {
            checkpoint_url,
            verify_url,
        });
    }
    if let Some(errors) = parsed.errors {
        return Err(LoginRejected::Errors(errors.error));
    }
    Err(LoginRejected::Unrecognized(body.to_string()))
}

fn report_rejection(username: &str, rejection: &LoginRejected) {
    warn!(username, "login failed");
    match rejection {
        LoginRejected::CheckpointRequired { verify_url, .. } => {
            warn!(%verify_url, "please verify your account");
        }
        LoginRejected::Errors(errors) => {
            for (index, error) in errors.iter().enumerate() {
                warn!(count = index + 1, %error, "session error");
            }
        }
        LoginRejected::Unrecognized(payload) => warn!(%payload, "unrecognized login response"),
    }
}
