//! One-shot client for the login endpoint.
//!
//! Trades a challenge plus credentials for a signed assertion with a
//! form-encoded POST. The response format is handled by
//! [`crate::domain::protocol::parse_login_response`].

use std::time::Duration;

use crate::domain::protocol::{Challenge, parse_login_response};
use crate::error::{LoginError, RelayError};

/// HTTP client bound to one login endpoint.
#[derive(Debug, Clone)]
pub struct LoginClient {
    http: reqwest::Client,
    login_url: String,
}

impl LoginClient {
    /// Creates a client for `login_url` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if the HTTP client cannot be built.
    pub fn new(login_url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build login client: {e}")))?;
        Ok(Self {
            http,
            login_url: login_url.into(),
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Requests an assertion for `username` answering `challenge`.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::Transport`] on network failure, timeout or a
    /// non-success status, and the errors of
    /// [`parse_login_response`] for an unusable body.
    pub async fn assertion(
        &self,
        username: &str,
        password: &str,
        challenge: &Challenge,
    ) -> Result<String, LoginError> {
        let challstr = challenge.challstr();
        let form = [
            ("act", "login"),
            ("name", username),
            ("pass", password),
            ("challstr", challstr.as_str()),
        ];

        let body = self
            .http
            .post(&self.login_url)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LoginError::Transport(e.to_string()))?
            .text()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        parse_login_response(&body)
    }
}
