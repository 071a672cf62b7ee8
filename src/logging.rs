//! Diagnostics setup. Everything goes to stderr; stdout carries only the report.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive for a `--verbose` level.
pub fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "off",
        1 => "ipenrich=error",
        2 => "ipenrich=warn",
        3 => "ipenrich=info",
        4 => "ipenrich=debug",
        _ => "ipenrich=trace",
    }
}

/// `RUST_LOG` when set, else the directive for `verbose`.
pub fn filter_for(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity_directive(verbose)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(verbose: u8) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter_for(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(verbose >= 5),
        )
        .try_init()
        .context("failed to initialise logging")
}
