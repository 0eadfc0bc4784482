//! Logging and observability setup for pathsafe
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the embedding application (or to tests) through the helpers below.

use std::io::IsTerminal;
use std::path::Path;
use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("pathsafe=debug,info")
            } else {
                EnvFilter::try_new("pathsafe=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize a compact, human-readable tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter. Verbose mode turns on
/// `debug` events, which include every rejected detector and rule.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_color())
                .with_target(verbose)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;
    Ok(())
}

/// Initialize a JSON tracing subscriber for machine consumption.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_json_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(default_filter(false))
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true),
        )
        .try_init()?;
    Ok(())
}

/// Span wrapping the validation of a single path.
pub fn validation_span(path: &Path) -> tracing::Span {
    span!(Level::INFO, "path_validation", path = %path.display())
}
