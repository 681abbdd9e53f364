//! Error types for Rel
//!
//! This module provides the error taxonomy for referrer discovery. Every
//! variant carries enough context to tell the user which reference or
//! operation failed.

use thiserror::Error;


/// Main error type for Rel operations
#[derive(Error, Debug)]
pub enum RelError {
    /// The subject string cannot be parsed into a store locator and a tag or digest
    #[error("Invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    /// Resource not found errors (404, missing tag or blob)
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// The store has no native referrers capability
    #[error("Referrers API not supported by {store}")]
    Unsupported { store: String },

    /// Network-related errors (connection, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication errors (401, 403)
    #[error("Authentication error (status: {status_code:?}): {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Rate limiting errors (429)
    #[error("Rate limit: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Server errors (500, 503)
    #[error("Server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Local storage errors (OCI layout directory I/O)
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors (malformed manifest, bad digest, bad selector)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referrer graph exceeded the traversal budget
    #[error("Recursion limit exceeded while discovering referrers of {reference}: {limit}")]
    RecursionLimitExceeded { reference: String, limit: String },

    /// Discovery was cancelled before it completed
    #[error("Discovery cancelled")]
    Cancelled,
}

/// Result type alias for Rel operations
pub type Result<T> = std::result::Result<T, RelError>;

impl RelError {
    /// Creates a new invalid reference error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    ///
    /// let err = RelError::invalid_reference("localhost:5000/repo", "missing tag or digest");
    /// assert!(matches!(err, RelError::InvalidReference { .. }));
    /// ```
    pub fn invalid_reference<R: Into<String>, M: Into<String>>(reference: R, message: M) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    ///
    /// let err = RelError::not_found("manifest", "localhost:5000/repo:v1");
    /// assert!(matches!(err, RelError::NotFound { .. }));
    /// ```
    pub fn not_found<S: Into<String>>(resource_type: S, name: S) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Creates a new unsupported-capability error for the given store.
    pub fn unsupported<S: Into<String>>(store: S) -> Self {
        Self::Unsupported {
            store: store.into(),
        }
    }

    /// Creates a new network error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    ///
    /// let err = RelError::network("connection refused");
    /// assert!(matches!(err, RelError::Network { .. }));
    /// ```
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new network error with a source error.
    pub fn network_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Authentication {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new server error.
    pub fn server<S: Into<String>>(message: S, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new storage error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
    /// let err = RelError::storage_with_source("failed to read index.json", io_err);
    /// assert!(matches!(err, RelError::Storage { .. }));
    /// ```
    pub fn storage_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    ///
    /// let err = RelError::validation("invalid manifest format");
    /// assert!(matches!(err, RelError::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S, path: Option<String>) -> Self {
        Self::Config {
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::error::RelError;
    /// use std::io;
    ///
    /// let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    /// let err = RelError::config_with_source("failed to read config", Some("/path/to/config.yaml"), io_err);
    /// assert!(matches!(err, RelError::Config { .. }));
    /// ```
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new recursion limit error.
    pub fn recursion_limit<R: Into<String>, L: Into<String>>(reference: R, limit: L) -> Self {
        Self::RecursionLimitExceeded {
            reference: reference.into(),
            limit: limit.into(),
        }
    }

    /// Returns true if the store signalled that it lacks the native referrers capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns true if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
