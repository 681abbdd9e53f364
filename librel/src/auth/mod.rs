//! Authentication handling for OCI registries.
//!
//! Credentials come from configuration and are sent as an `Authorization`
//! header. Registries that answer with a Bearer challenge are handled by
//! exchanging the credentials for a short-lived token at the challenge realm.

use crate::error::{Result, RelError};
use serde::Deserialize;


/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No authentication required (anonymous access)
    #[default]
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },

    /// Bearer token authentication (OAuth2-style)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// assert!(creds.to_header_value().unwrap().starts_with("Basic "));
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates Bearer token credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::Credentials;
    ///
    /// let creds = Credentials::bearer("token123");
    /// assert_eq!(creds.to_header_value().unwrap(), "Bearer token123");
    /// ```
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Returns true if no credentials are configured.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the Authorization header value for these credentials.
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                use base64::{Engine as _, engine::general_purpose};
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme (e.g., "Bearer")
    pub scheme: String,

    /// The authentication realm
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// Example header: `Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull"`
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::AuthChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme, "Bearer");
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();

        let (scheme, params) = header
            .split_once(' ')
            .ok_or_else(|| RelError::validation("Invalid WWW-Authenticate header format"))?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        for param in params.split(',') {
            let param = param.trim();
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "realm" => realm = Some(value.to_string()),
                    "service" => service = Some(value.to_string()),
                    "scope" => scope = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let realm = realm.ok_or_else(|| {
            RelError::validation("WWW-Authenticate header missing required 'realm' parameter")
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            realm,
            service,
            scope,
        })
    }

    /// Returns true if the registry asks for a Bearer token.
    pub fn is_bearer(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("bearer")
    }

    /// Builds the token endpoint URL for this challenge.
    ///
    /// When the challenge carries no scope, a pull scope for `repository` is
    /// requested.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::AuthChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(
    ///     challenge.token_url("library/alpine"),
    ///     "https://auth.example.com/token?service=registry&scope=repository:library/alpine:pull"
    /// );
    /// ```
    pub fn token_url(&self, repository: &str) -> String {
        let scope = self
            .scope
            .clone()
            .unwrap_or_else(|| format!("repository:{}:pull", repository));
        let mut url = self.realm.clone();
        let mut sep = if url.contains('?') { '&' } else { '?' };
        if let Some(service) = &self.service {
            url.push_str(&format!("{}service={}", sep, service));
            sep = '&';
        }
        url.push_str(&format!("{}scope={}", sep, scope));
        url
    }
}

/// Body returned by a registry token endpoint.
///
/// Registries disagree on the field name, so both are accepted.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl TokenResponse {
    /// Returns the issued token.
    pub fn into_token(self) -> Result<String> {
        self.token
            .or(self.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RelError::authentication("Token endpoint returned no token", None))
    }
}
