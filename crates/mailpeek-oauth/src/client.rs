//! `OAuth2` client configuration shared by flows.

use std::collections::HashMap;

use reqwest::Client;

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};

/// A public `OAuth2` client bound to one provider.
///
/// Public clients (CLI tools, native apps) authenticate with a client id
/// only; there is no client secret.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID registered with the provider.
    pub client_id: String,
    /// Provider endpoint configuration.
    pub provider: Provider,
    pub(crate) http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Redeems a refresh token for a new access token.
    ///
    /// If the server does not return a new refresh token, the old one is
    /// carried over so the caller can keep refreshing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoRefreshToken`] if `token` has no refresh
    /// token, or the server's error if the grant is rejected.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        let mut new_token = Token::from_response(token_response);

        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }

        Ok(new_token)
    }
}
