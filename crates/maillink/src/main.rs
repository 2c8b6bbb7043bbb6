//! `maillink` - account-independent deep links to Gmail messages.
//!
//! Resolves a message (or a thread's newest message) to its RFC 822
//! Message-ID and prints a `rfc822msgid:` search link that opens it from any
//! account slot.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod app;
mod cli;
mod desktop;
mod host;
mod settings;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries links and protocol replies; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "maillink=info,maillink_core=info,maillink_dom=info,maillink_oauth=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    debug!(version = env!("CARGO_PKG_VERSION"), "Starting maillink");
    cli::run(cli).await
}
