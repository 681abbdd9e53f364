//! Application configuration.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then environment variables prefixed with `REL_` (nested keys separated by
//! a double underscore, e.g. `REL_NETWORK__TIMEOUT=60`).

use crate::auth::Credentials;
use crate::client::ClientConfig;
use crate::error::{Result, RelError};
use crate::graph::{DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, TraversalBudget};
use crate::render::OutputFormat;
use config::{Config as ConfigRs, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;


/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "REL";

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub discovery: Discovery,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Parses a `Config` from a YAML string layered over the defaults.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(s, FileFormat::Yaml));
        Self::from_builder(builder, None)
    }

    /// Loads configuration from defaults, an optional file and the environment.
    ///
    /// A path that is given must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading overrides from `env` instead of the
    /// process environment when it is given.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Self::defaults()?;

        if let Some(p) = path {
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("network.plain_http")
                .source(env),
        );

        Self::from_builder(builder, path)
    }

    fn defaults() -> Result<Builder> {
        let defaults = ConfigRs::try_from(&Config::default()).map_err(|e| {
            RelError::config_with_source("Failed to build default configuration", None, e)
        })?;
        Ok(ConfigRs::builder().add_source(defaults))
    }

    fn from_builder(builder: Builder, path: Option<&Path>) -> Result<Self> {
        let path = path.map(|p| p.display().to_string());
        let config: Self = builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                RelError::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.clone(),
                    e,
                )
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: Option<String>) -> Result<()> {
        let checks = [
            ("discovery.concurrency", self.discovery.concurrency),
            ("discovery.max_nodes", self.discovery.max_nodes),
            ("discovery.max_depth", self.discovery.max_depth),
            ("network.max_idle_per_host", self.network.max_idle_per_host),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(RelError::config(
                    format!("{} must be greater than zero", key),
                    path.clone(),
                ));
            }
        }
        if self.network.timeout == 0 {
            return Err(RelError::config("network.timeout must be greater than zero", path));
        }
        Ok(())
    }
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// Registries contacted over plain HTTP.
    #[serde(default)]
    pub plain_http: Vec<String>,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
            plain_http: Vec::new(),
        }
    }
}

impl Network {
    /// Returns true if `registry` is listed under `plain_http`.
    pub fn is_plain_http(&self, registry: &str) -> bool {
        self.plain_http.iter().any(|r| r == registry)
    }

    /// Returns the HTTP client settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(self.timeout)
            .with_max_idle_per_host(self.max_idle_per_host)
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_max_idle_per_host() -> usize {
    10
}

/// Discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Discovery {
    /// Sibling fetches in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_nodes: default_max_nodes(),
            max_depth: default_max_depth(),
        }
    }
}

impl Discovery {
    pub fn budget(&self) -> TraversalBudget {
        TraversalBudget {
            max_nodes: self.max_nodes,
            max_depth: self.max_depth,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_max_nodes() -> usize {
    DEFAULT_MAX_NODES
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Output {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Registry credentials.
///
/// A token takes precedence over a username and password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl CredentialsConfig {
    pub fn to_credentials(&self) -> Credentials {
        match (&self.token, &self.username) {
            (Some(token), _) if !token.is_empty() => Credentials::bearer(token.clone()),
            (_, Some(username)) if !username.is_empty() => Credentials::basic(
                username.clone(),
                self.password.clone().unwrap_or_default(),
            ),
            _ => Credentials::anonymous(),
        }
    }
}
