//! `OAuth2` provider endpoint configuration.

use url::Url;

use crate::error::{Error, Result};

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Device authorization endpoint URL.
    pub device_auth_url: Url,
    /// Default scopes requested when the caller passes none.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a custom provider configuration.
    ///
    /// Mainly useful for pointing flows at a mock authorization server in
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid.
    pub fn new(
        name: impl Into<String>,
        token_url: impl AsRef<str>,
        device_auth_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            token_url: Url::parse(token_url.as_ref())?,
            device_auth_url: Url::parse(device_auth_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Microsoft identity platform configuration for a given tenant.
    ///
    /// `tenant` is the path segment of the authority URL: `common`,
    /// `organizations`, `consumers`, or a directory GUID.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant produces an invalid URL.
    pub fn microsoft(tenant: &str) -> Result<Self> {
        if tenant.is_empty() {
            return Err(Error::InvalidConfig("tenant is empty".into()));
        }
        let authority = format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0");
        Ok(Self::new(
            "Microsoft",
            format!("{authority}/token"),
            format!("{authority}/devicecode"),
        )?
        .with_default_scopes(vec![
            "User.Read".to_string(),
            "Mail.Read".to_string(),
            "offline_access".to_string(),
        ]))
    }
}
