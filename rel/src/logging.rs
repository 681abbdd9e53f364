//! Log output for the CLI.
//!
//! Logs go to stderr so stdout carries only rendered output. `RUST_LOG`
//! takes precedence over `-v`.

use crate::context::VerbosityLevel;
use tracing_subscriber::EnvFilter;

/// Filter directives for a verbosity level
pub fn directives(verbosity: VerbosityLevel) -> String {
    let level = verbosity.log_level();
    format!("warn,rel={level},librel={level}")
}

/// Install the global subscriber
pub fn init(verbosity: VerbosityLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbosity)));

    // Ignore failure when a subscriber is already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity >= VerbosityLevel::Debug)
        .try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
