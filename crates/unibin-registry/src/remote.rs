//! Remote carrier store
//!
//! Downloads pre-built carriers from a release URL and uploads freshly built
//! ones. Transient failures (connect errors, 5xx, 429) are retried with
//! exponential backoff; definitive failures (404, 4xx) are not.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::identifier::CarrierId;

/// Default base URL carriers are published under.
pub const DEFAULT_BASE_URL: &str = "https://github.com/unibin/unibin/releases/download/carriers";

/// Request timeout. Carriers run to hundreds of megabytes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts per transfer, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Initial backoff, doubled after each failed attempt.
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Errors that can occur talking to the remote store
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP transport failure after retries were exhausted
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Carrier does not exist remotely
    #[error("carrier not published: {0}")]
    NotFound(String),

    /// Server kept failing after retries
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// Upload requires an authorization token
    #[error("upload not authorized: {0}")]
    Unauthorized(String),
}

/// Blocking client for the remote carrier store.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RemoteStore {
    /// Create a store client against the default release URL.
    pub fn new() -> Result<Self, RemoteError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a store client against a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("unibin/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Attach a bearer token used for uploads.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn artifact_url(&self, id: &CarrierId) -> String {
        format!("{}/{}", self.base_url, id.file_name())
    }

    /// Download a carrier's bytes.
    pub fn download(&self, id: &CarrierId) -> Result<Vec<u8>, RemoteError> {
        let url = self.artifact_url(id);
        self.with_retry(|| {
            let response = match self.client.get(&url).send() {
                Ok(r) => r,
                Err(e) => return Attempt::Retry(RemoteError::Http(e)),
            };
            match response.status() {
                StatusCode::NOT_FOUND => {
                    Attempt::Fatal(RemoteError::NotFound(id.file_name()))
                }
                status if status.is_success() => match response.bytes() {
                    Ok(bytes) => Attempt::Done(bytes.to_vec()),
                    Err(e) => Attempt::Retry(RemoteError::Http(e)),
                },
                status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                    Attempt::Retry(RemoteError::Unavailable(format!(
                        "GET {} returned {}",
                        url, status
                    )))
                }
                status => Attempt::Fatal(RemoteError::Unavailable(format!(
                    "GET {} returned {}",
                    url, status
                ))),
            }
        })
    }

    /// Upload a freshly built carrier under its identifier.
    pub fn upload(&self, id: &CarrierId, bytes: &[u8]) -> Result<(), RemoteError> {
        let token = self.auth_token.as_deref().ok_or_else(|| {
            RemoteError::Unauthorized("no token configured for upload".to_string())
        })?;
        let url = self.artifact_url(id);

        self.with_retry(|| {
            let result = self
                .client
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes.to_vec())
                .send();
            let response = match result {
                Ok(r) => r,
                Err(e) => return Attempt::Retry(RemoteError::Http(e)),
            };
            match response.status() {
                status if status.is_success() => Attempt::Done(()),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Attempt::Fatal(
                    RemoteError::Unauthorized(format!("POST {} returned {}", url, response.status())),
                ),
                status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                    Attempt::Retry(RemoteError::Unavailable(format!(
                        "POST {} returned {}",
                        url, status
                    )))
                }
                status => Attempt::Fatal(RemoteError::Unavailable(format!(
                    "POST {} returned {}",
                    url, status
                ))),
            }
        })
    }

    /// Run `op` up to [`MAX_ATTEMPTS`] times with doubling backoff between
    /// retryable failures.
    fn with_retry<T>(
        &self,
        mut op: impl FnMut() -> Attempt<T>,
    ) -> Result<T, RemoteError> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match op() {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Retry(err) => {
                    last_err = Some(err);
                    if attempt + 1 < MAX_ATTEMPTS {
                        thread::sleep(backoff);
                        backoff *= 2;
                    }
                }
            }
        }
        Err(last_err.expect("retry loop ran at least once"))
    }
}

/// Outcome of one transfer attempt.
enum Attempt<T> {
    Done(T),
    Retry(RemoteError),
    Fatal(RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{Arch, Platform};
    use unibin_core::BucketMb;

    #[test]
    fn test_artifact_url() {
        let store = RemoteStore::with_base_url("https://example.com/carriers/").unwrap();
        let id = CarrierId::new(
            Platform::Alpine,
            Arch::Arm64,
            "18.16.0",
            BucketMb::new(6).unwrap(),
        );
        assert_eq!(
            store.artifact_url(&id),
            "https://example.com/carriers/alpine-arm64-18.16.0-v1-6MB"
        );
    }

    #[test]
    fn test_upload_requires_token() {
        let store = RemoteStore::with_base_url("https://example.com").unwrap();
        let id = CarrierId::new(
            Platform::Linux,
            Arch::X64,
            "18.16.0",
            BucketMb::new(2).unwrap(),
        );
        assert!(matches!(
            store.upload(&id, b"bytes"),
            Err(RemoteError::Unauthorized(_))
        ));
    }
}
