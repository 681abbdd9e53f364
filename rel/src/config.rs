//! Configuration file location.
//!
//! The file is looked up in this order:
//! 1. `--config <PATH>`
//! 2. `REL_CONFIG`
//! 3. `<config dir>/rel/config.yaml`

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "REL_CONFIG";

/// Where the configuration file is and whether the user asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    /// True when given on the command line or in `REL_CONFIG`; such a file
    /// must exist.
    pub explicit: bool,
}

/// Get the path to the configuration file
pub fn get_config_path(cli_path: Option<&Path>) -> ConfigPath {
    resolve_config_path(
        cli_path,
        env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()),
        dirs::config_dir(),
    )
}

fn resolve_config_path(
    cli_path: Option<&Path>,
    env_path: Option<String>,
    config_dir: Option<PathBuf>,
) -> ConfigPath {
    if let Some(path) = cli_path {
        return ConfigPath {
            path: path.to_path_buf(),
            explicit: true,
        };
    }
    if let Some(path) = env_path {
        return ConfigPath {
            path: PathBuf::from(path),
            explicit: true,
        };
    }

    // Fall back to the current directory when there is no config dir
    let path = match config_dir {
        Some(dir) => dir.join("rel").join("config.yaml"),
        None => PathBuf::from("config.yaml"),
    };
    ConfigPath {
        path,
        explicit: false,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
