//! Device Authorization Grant (RFC 8628).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::OAuthClient;
use crate::error::{Error, Result};
use crate::token::{ErrorResponse, Token, TokenResponse};

/// Device authorization response from the `devicecode` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code the client polls with.
    pub device_code: String,
    /// Short code the user types in at the verification URI.
    pub user_code: String,
    /// Verification URI where the user approves the request.
    pub verification_uri: String,
    /// Verification URI with the user code embedded (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Ready-made instruction text for the user, if the server provides one
    /// (the Microsoft identity platform does).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Lifetime of the device code in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds (minimum 5 per RFC 8628).
    #[serde(default = "default_interval")]
    pub interval: u32,
}

const fn default_interval() -> u32 {
    5
}

/// Outcome of a single token poll while the user approval is pending.
#[derive(Debug)]
enum PollOutcome {
    /// User completed authorization; token granted.
    Granted(Token),
    /// User has not finished yet; poll again after the current interval.
    Pending,
    /// Server asked us to back off; add 5 seconds to the interval.
    SlowDown,
}

/// Device Authorization Grant for `OAuth2`.
///
/// Suited to CLI tools: the user approves the request in a browser on any
/// device while the tool polls the token endpoint.
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// Returns the user code and verification URI the caller must surface to
    /// the user, along with the device code used for polling.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Scopes to request (provider defaults if None)
    ///
    /// # Errors
    ///
    /// Returns the server's error if the authorization request is rejected.
    pub async fn begin(&self, scopes: Option<&[String]>) -> Result<DeviceAuthorization> {
        let scope_str = scopes.map_or_else(
            || self.client.provider.default_scopes.join(" "),
            |s| s.join(" "),
        );

        let mut params = HashMap::new();
        params.insert("client_id", self.client.client_id.as_str());
        if !scope_str.is_empty() {
            params.insert("scope", &scope_str);
        }

        let response = self
            .client
            .http_client
            .post(self.client.provider.device_auth_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        response.json().await.map_err(Into::into)
    }

    /// One poll of the token endpoint, preceded by the interval sleep.
    async fn poll(&self, device_code: &str, interval: Duration) -> Result<PollOutcome> {
        tokio::time::sleep(interval).await;

        let mut params = HashMap::new();
        params.insert("grant_type", "urn:ietf:params:oauth:grant-type:device_code");
        params.insert("device_code", device_code);
        params.insert("client_id", &self.client.client_id);

        let response = self
            .client
            .http_client
            .post(self.client.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;

            return match error.error.as_str() {
                "authorization_pending" => Ok(PollOutcome::Pending),
                "slow_down" => Ok(PollOutcome::SlowDown),
                "access_denied" => Err(Error::AccessDenied),
                "expired_token" => Err(Error::CodeExpired),
                _ => Err(error.into_error()),
            };
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(PollOutcome::Granted(Token::from_response(token_response)))
    }

    /// Blocks until the user completes the out-of-band approval.
    ///
    /// Polls the token endpoint at the server-supplied interval until the
    /// token is granted, the user denies the request, or the device code's
    /// `expires_in` deadline passes. A `slow_down` response adds 5 seconds
    /// to the interval per RFC 8628.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] on denial and [`Error::CodeExpired`]
    /// once the device code lifetime is exhausted.
    pub async fn wait_for_approval(&self, auth: &DeviceAuthorization) -> Result<Token> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(u64::from(auth.expires_in));
        let mut interval = Duration::from_secs(u64::from(auth.interval));

        loop {
            if tokio::time::Instant::now() + interval >= deadline {
                return Err(Error::CodeExpired);
            }

            match self.poll(&auth.device_code, interval).await? {
                PollOutcome::Granted(token) => return Ok(token),
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += Duration::from_secs(5),
            }
        }
    }
}
