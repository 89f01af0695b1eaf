//! Fixed application configuration.
//!
//! mailpeek takes no command-line arguments and reads no configuration
//! files; these values are the whole surface. They live in one struct so
//! the authenticator and fetcher receive them explicitly instead of
//! reaching for embedded literals, and so tests can substitute a mock
//! identity endpoint or Graph host.

/// Client ID of the "Microsoft Graph PowerShell" public application.
///
/// A well-known public client that is pre-consented for delegated mail
/// access in most tenants, so users do not need their own app
/// registration.
pub const CLIENT_ID: &str = "14d82eec-204b-4c2f-b7e8-296a70dab67e";

/// Multi-tenant authority segment.
pub const TENANT: &str = "common";

/// Microsoft Graph host.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OAuth2 public client ID.
    pub client_id: String,
    /// Authority tenant segment (`common`, `organizations`, or a GUID).
    pub tenant: String,
    /// Delegated scopes to request.
    pub scopes: Vec<String>,
    /// Base URL of the Graph API.
    pub graph_base_url: String,
    /// Number of messages to list.
    pub message_count: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            tenant: TENANT.to_string(),
            // offline_access yields a refresh token, which is what makes
            // silent acquisition on later runs possible at all.
            scopes: vec![
                "User.Read".to_string(),
                "Mail.Read".to_string(),
                "offline_access".to_string(),
            ],
            graph_base_url: GRAPH_BASE_URL.to_string(),
            message_count: 5,
        }
    }
}
