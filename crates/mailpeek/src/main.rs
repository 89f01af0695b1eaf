//! Binary entry point.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use mailpeek::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpeek=info,mailpeek_oauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Errors are reported inline; the process still exits normally.
    if let Err(e) = mailpeek::run(&AppConfig::default()).await {
        println!("An error occurred: {e:#}");
    }
}
