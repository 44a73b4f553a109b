//! Single-attempt HTTP GET through a session.
//!
//! The [`Transport`] seam lets the retry loop run against scripted
//! responses; [`HttpTransport`] is the reqwest-backed implementation.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};
use url::Url;

use super::FetchError;
use crate::auth::Session;
use crate::config::FetchSettings;

/// One response as it came off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Length` header value, if present and numeric.
    pub declared_length: Option<u64>,
    /// Body bytes actually received.
    pub body: Vec<u8>,
}

/// Issues one GET attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET for `url` with the session's headers and cookies.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for network failures, timeouts and malformed
    /// URLs. HTTP error statuses are returned as responses, not errors.
    async fn get(&self, url: &str, session: &Session) -> Result<RawResponse, FetchError>;
}

/// Builds the shared reqwest client.
///
/// Session state is attached per request, so the client carries no
/// cookie store and no default User-Agent. Redirects are followed.
///
/// # Errors
///
/// Returns the reqwest builder error if the TLS backend cannot be initialized.
pub fn build_client(settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.read_timeout)
        .gzip(true)
        .build()
}

/// Reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns the underlying reqwest client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, session), fields(url = %url))]
    async fn get(&self, url: &str, session: &Session) -> Result<RawResponse, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = session
            .apply(self.client.get(url))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let declared_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let body = read_body(response, url).await?;
        debug!(status, received = body.len(), ?declared_length, "response received");

        Ok(RawResponse {
            status,
            declared_length,
            body,
        })
    }
}

/// Streams the body, counting what actually arrives.
async fn read_body(response: reqwest::Response, url: &str) -> Result<Vec<u8>, FetchError> {
    let mut stream = response.bytes_stream();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
