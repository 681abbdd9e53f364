//! HTTP client for OCI registry communication.
//!
//! This module provides a thin HTTP client built on reqwest for the parts of
//! the OCI Distribution Specification v2 API that referrer discovery needs:
//! manifest fetches and the Referrers API.

use crate::auth::{AuthChallenge, Credentials, TokenResponse};
use crate::error::{Result, RelError};
use crate::oci::{Descriptor, MANIFEST_ACCEPT, MEDIA_TYPE_IMAGE_INDEX, ManifestSummary};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};


/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use librel::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_max_idle_per_host(20);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Maximum idle connections per host (default: 10)
    pub max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::client::ClientConfig;
    ///
    /// let config = ClientConfig::new();
    /// assert_eq!(config.timeout_seconds, 30);
    /// assert_eq!(config.max_idle_per_host, 10);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the maximum idle connections per host.
    pub fn with_max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }
}

/// A manifest as returned by the registry.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    /// Raw manifest bytes.
    pub content: Vec<u8>,
    /// Value of the `Docker-Content-Digest` header, if sent.
    pub digest: Option<String>,
    /// Value of the `Content-Type` header without parameters, if sent.
    pub media_type: Option<String>,
}

/// HTTP client for OCI registry operations.
///
/// Clones share the connection pool and any token obtained from the
/// registry's token endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: ReqwestClient,
    registry_url: String,
    credentials: Credentials,
    token: Arc<Mutex<Option<String>>>,
    timeout_seconds: u64,
}

impl Client {
    /// Creates a new client for the specified registry URL.
    ///
    /// A URL without a scheme is contacted over plain `http://`.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::Credentials;
    /// use librel::client::{Client, ClientConfig};
    ///
    /// let client = Client::new(
    ///     "http://localhost:5000",
    ///     Credentials::anonymous(),
    ///     ClientConfig::new().with_timeout(60),
    /// )
    /// .unwrap();
    /// assert_eq!(client.registry_url(), "http://localhost:5000");
    /// ```
    pub fn new(registry_url: &str, credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let normalized_url = Self::normalize_url(registry_url)?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(|e| RelError::network_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            registry_url: normalized_url,
            credentials,
            token: Arc::new(Mutex::new(None)),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Normalizes a registry URL by ensuring it has a scheme and removing trailing slashes.
    fn normalize_url(url: &str) -> Result<String> {
        let url = url.trim();

        if url.is_empty() {
            return Err(RelError::validation("Registry URL cannot be empty"));
        }

        let url = if !url.starts_with("http://") && !url.starts_with("https://") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Returns the base registry URL.
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Fetches a manifest by tag or digest.
    ///
    /// Performs `GET /v2/<name>/manifests/<reference>` accepting both OCI and
    /// Docker manifest and index media types.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the registry answers 404, and the usual
    /// transport, authentication and server errors otherwise.
    pub async fn fetch_manifest(
        &self,
        repository: &str,
        reference: &str,
    ) -> Result<ManifestResponse> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.registry_url, repository, reference
        );

        let response = self.get(&url, MANIFEST_ACCEPT, repository).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelError::not_found(
                "manifest".to_string(),
                format!("{}/{}:{}", self.host(), repository, reference),
            ));
        }

        let digest = response
            .headers()
            .get("Docker-Content-Digest")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let media_type = Self::content_type(response.headers());

        let response = Self::check_response_status(response).await?;
        let content = response
            .bytes()
            .await
            .map_err(|e| RelError::network_with_source("Failed to read manifest response", e))?;
        trace!(%url, size = content.len(), "Fetched manifest");

        Ok(ManifestResponse {
            content: content.to_vec(),
            digest,
            media_type,
        })
    }

    /// Lists the referrers of `digest` through the Referrers API.
    ///
    /// Performs `GET /v2/<name>/referrers/<digest>` and follows `Link`
    /// pagination until every page has been read.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` when the registry answers 404 or responds with
    /// anything other than an image index, which is how registries without
    /// the Referrers API behave.
    pub async fn fetch_referrers(&self, repository: &str, digest: &str) -> Result<Vec<Descriptor>> {
        let mut all_referrers = Vec::new();
        let mut url = format!(
            "{}/v2/{}/referrers/{}",
            self.registry_url, repository, digest
        );

        loop {
            let response = self.get(&url, MEDIA_TYPE_IMAGE_INDEX, repository).await?;
            if response.status() == StatusCode::NOT_FOUND {
                debug!(%url, "Referrers API answered 404");
                return Err(RelError::unsupported(self.registry_url.as_str()));
            }

            let next_path = Self::extract_next_link(response.headers());
            let content_type = Self::content_type(response.headers());
            let response = Self::check_response_status(response).await?;

            if let Some(content_type) = &content_type
                && content_type != MEDIA_TYPE_IMAGE_INDEX
            {
                debug!(%url, %content_type, "Referrers API returned a non-index response");
                return Err(RelError::unsupported(self.registry_url.as_str()));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| RelError::network_with_source("Failed to read referrers response", e))?;
            let index = ManifestSummary::from_bytes(&body)?;
            if content_type.is_none() && !index.is_index() {
                return Err(RelError::unsupported(self.registry_url.as_str()));
            }
            all_referrers.extend(index.manifests.unwrap_or_default());

            match next_path {
                Some(path) if path.starts_with("http://") || path.starts_with("https://") => {
                    url = path
                }
                Some(path) => url = format!("{}{}", self.registry_url, path),
                None => break,
            }
        }

        Ok(all_referrers)
    }

    fn host(&self) -> &str {
        self.registry_url
            .split_once("://")
            .map(|(_, host)| host)
            .unwrap_or(&self.registry_url)
    }

    fn authorization(&self) -> Option<String> {
        let token = self.token.lock().ok().and_then(|t| t.clone());
        match token {
            Some(token) => Some(format!("Bearer {}", token)),
            None => self.credentials.to_header_value(),
        }
    }

    /// Sends a GET request, answering a Bearer challenge once if needed.
    async fn get(&self, url: &str, accept: &str, repository: &str) -> Result<Response> {
        let response = self.send(url, accept).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| AuthChallenge::parse(v).ok());
        let Some(challenge) = challenge.filter(AuthChallenge::is_bearer) else {
            return Ok(response);
        };

        let token = self.fetch_token(&challenge, repository).await?;
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token);
        }
        self.send(url, accept).await
    }

    async fn send(&self, url: &str, accept: &str) -> Result<Response> {
        let mut request = self.http_client.get(url).header(ACCEPT, accept);
        if let Some(auth_header) = self.authorization() {
            request = request.header(AUTHORIZATION, auth_header);
        }
        request
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))
    }

    async fn fetch_token(&self, challenge: &AuthChallenge, repository: &str) -> Result<String> {
        let url = challenge.token_url(repository);
        debug!(realm = %challenge.realm, "Requesting registry token");

        let mut request = self.http_client.get(&url);
        if let Credentials::Basic { .. } = self.credentials
            && let Some(auth_header) = self.credentials.to_header_value()
        {
            request = request.header(AUTHORIZATION, auth_header);
        }
        let response = request
            .send()
            .await
            .map_err(|e| self.translate_reqwest_error(e))?;
        let response = Self::check_response_status(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RelError::validation_with_source("Failed to parse token response", e))?;
        token.into_token()
    }

    fn content_type(headers: &HeaderMap) -> Option<String> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Extracts the next page URL from the Link header.
    ///
    /// The OCI Distribution Specification uses the Link header for pagination:
    /// `Link: </v2/repo/referrers/sha256:abc?last=xyz>; rel="next"`
    fn extract_next_link(headers: &HeaderMap) -> Option<String> {
        let link_header = headers.get(reqwest::header::LINK)?;
        let link_str = link_header.to_str().ok()?;

        for link_part in link_str.split(',') {
            let link_part = link_part.trim();

            if (link_part.contains("rel=\"next\"") || link_part.contains("rel='next'"))
                && let Some(start) = link_part.find('<')
                && let Some(len) = link_part[start + 1..].find('>')
            {
                return Some(link_part[start + 1..start + 1 + len].to_string());
            }
        }

        None
    }

    /// Translates a reqwest error into a RelError.
    fn translate_reqwest_error(&self, error: reqwest::Error) -> RelError {
        let registry_url = &self.registry_url;
        if error.is_timeout() {
            RelError::network(format!(
                "Request to {} timed out after {} seconds",
                registry_url, self.timeout_seconds
            ))
        } else if error.is_connect() {
            RelError::network_with_source(
                format!("Failed to connect to registry at {}", registry_url),
                error,
            )
        } else if error.is_request() {
            RelError::network_with_source(
                format!("Failed to send request to {}", registry_url),
                error,
            )
        } else {
            RelError::network_with_source(
                format!("Network error communicating with {}", registry_url),
                error,
            )
        }
    }

    /// Checks the HTTP response status and translates errors to RelError.
    async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(unable to read response body)"));

        match status {
            StatusCode::UNAUTHORIZED => Err(RelError::authentication(
                format!("Authentication required for {}: {}", url, error_body),
                Some(401),
            )),
            StatusCode::FORBIDDEN => Err(RelError::authentication(
                format!("Access forbidden for {}: {}", url, error_body),
                Some(403),
            )),
            StatusCode::NOT_FOUND => Err(RelError::not_found("endpoint".to_string(), url)),
            StatusCode::TOO_MANY_REQUESTS => Err(RelError::rate_limit(
                format!("Rate limit exceeded for {}", url),
                retry_after,
            )),
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => Err(RelError::server(
                format!("Server error from {}: {}", url, error_body),
                status.as_u16(),
            )),
            _ => Err(RelError::network(format!(
                "HTTP {} from {}: {}",
                status.as_u16(),
                url,
                error_body
            ))),
        }
    }
}
