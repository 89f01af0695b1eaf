//! # mailpeek-oauth
//!
//! `OAuth2` Device Authorization Grant (RFC 8628) for the Microsoft
//! identity platform.
//!
//! The crate covers the two acquisition paths a public CLI client needs:
//!
//! - **Interactive**: [`DeviceFlow`] requests a user code, the caller shows
//!   it to the user, and [`DeviceFlow::wait_for_approval`] polls the token
//!   endpoint until the out-of-band approval completes.
//! - **Silent**: [`OAuthClient::refresh_token`] redeems a stored refresh
//!   token without user interaction.
//!
//! ## Example
//!
//! ```ignore
//! use mailpeek_oauth::{DeviceFlow, OAuthClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::microsoft("common")?;
//!     let client = OAuthClient::new("your_client_id", provider);
//!     let flow = DeviceFlow::new(client);
//!
//!     let auth = flow.begin(None).await?;
//!     println!("Visit {} and enter code {}", auth.verification_uri, auth.user_code);
//!
//!     let token = flow.wait_for_approval(&auth).await?;
//!     println!("Authorized, token expires at {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod device;
mod error;
mod provider;
mod token;

pub use client::OAuthClient;
pub use device::{DeviceAuthorization, DeviceFlow};
pub use error::{Error, Result};
pub use provider::Provider;
pub use token::{ErrorResponse, Token, TokenResponse};
