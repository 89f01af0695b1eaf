//! mailpeek - list recent Outlook mail from the terminal.
//!
//! Signs in against the Microsoft identity platform with the OAuth2
//! device-code flow (silently when a cached session exists), then lists
//! the most recent messages in the mailbox via Microsoft Graph.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod graph;
pub mod render;

use anyhow::Context;

use auth::Authenticator;
use config::AppConfig;
use graph::GraphClient;

/// Runs the fixed authenticate-then-list sequence.
///
/// # Errors
///
/// Returns an error if authentication or the mail fetch fails; the caller
/// is expected to print it and exit normally.
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let authenticator =
        Authenticator::from_config(config).context("invalid identity configuration")?;
    let token = authenticator.obtain_token().await?;

    println!();
    println!("Successfully authenticated! Fetching emails via Microsoft Graph...");
    println!();

    let client = GraphClient::new(config.graph_base_url.clone());
    let messages = client.fetch_recent(&token, config.message_count).await?;

    render::print_list(&messages);
    Ok(())
}
