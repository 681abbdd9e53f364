//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags (applied by the command that owns them)
//!
//! Once built, the context is passed as read-only throughout the application.

use crate::config::{self, ConfigPath};
use librel::{Config, Result};
use std::path::Path;
use tracing::debug;

/// Verbosity level selected with `-v`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    #[default]
    Normal,
    Verbose,
    Debug,
    Trace,
}

impl VerbosityLevel {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Normal,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }

    /// Log level for rel's own targets
    pub fn log_level(&self) -> &'static str {
        match self {
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
            VerbosityLevel::Trace => "trace",
        }
    }

    /// Whether output includes annotations
    pub fn is_verbose(&self) -> bool {
        *self >= VerbosityLevel::Verbose
    }
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    pub verbosity: VerbosityLevel,
}

impl AppContext {
    /// Build context with precedence: defaults > config file > env vars
    pub fn build(cli_config: Option<&Path>, verbosity: VerbosityLevel) -> Result<Self> {
        let config = Self::load_config(&config::get_config_path(cli_config))?;
        Ok(Self { config, verbosity })
    }

    fn load_config(location: &ConfigPath) -> Result<Config> {
        // A missing default file just means no file layer
        if location.explicit || location.path.exists() {
            debug!(path = %location.path.display(), "Loading configuration file");
            Config::load(Some(&location.path))
        } else {
            Config::load(None)
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
