//! Remote registry store.
//!
//! Talks to one repository on an OCI registry through [`Client`].

use super::Store;
use crate::auth::Credentials;
use crate::client::{Client, ClientConfig};
use crate::digest::Digest;
use crate::error::Result;
use crate::oci::{Descriptor, ManifestSummary, new_descriptor};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::debug;

/// Registry host users type for Docker Hub.
const DOCKER_HUB: &str = "docker.io";

/// Host that actually serves the Docker Hub registry API.
const DOCKER_HUB_ENDPOINT: &str = "registry-1.docker.io";

/// A store backed by a repository on a remote registry.
pub struct RemoteStore {
    client: Client,
    repository: String,
    locator: String,
}

impl RemoteStore {
    /// Creates a store for `registry/repository`.
    ///
    /// Localhost registries and hosts with `plain_http` set are contacted
    /// over `http://`; everything else uses `https://`.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::auth::Credentials;
    /// use librel::client::ClientConfig;
    /// use librel::store::{RemoteStore, Store};
    ///
    /// let store = RemoteStore::new(
    ///     "localhost:5000",
    ///     "foobar",
    ///     Credentials::anonymous(),
    ///     ClientConfig::default(),
    ///     false,
    /// )
    /// .unwrap();
    /// assert_eq!(store.locator(), "localhost:5000/foobar");
    /// ```
    pub fn new(
        registry: &str,
        repository: &str,
        credentials: Credentials,
        config: ClientConfig,
        plain_http: bool,
    ) -> Result<Self> {
        let url = registry_url(registry, plain_http);
        debug!(%registry, %url, "Using registry endpoint");
        let client = Client::new(&url, credentials, config)?;
        Ok(Self {
            client,
            repository: repository.to_string(),
            locator: format!("{}/{}", registry, repository),
        })
    }

    /// Returns the repository this store reads from.
    pub fn repository(&self) -> &str {
        &self.repository
    }
}

/// Maps a registry host to the base URL of its API.
///
/// # Examples
///
/// ```
/// use librel::store::remote::registry_url;
///
/// assert_eq!(registry_url("docker.io", false), "https://registry-1.docker.io");
/// assert_eq!(registry_url("localhost:5000", false), "http://localhost:5000");
/// assert_eq!(registry_url("ghcr.io", false), "https://ghcr.io");
/// assert_eq!(registry_url("registry.lan", true), "http://registry.lan");
/// ```
pub fn registry_url(registry: &str, plain_http: bool) -> String {
    let host = if registry == DOCKER_HUB {
        DOCKER_HUB_ENDPOINT
    } else {
        registry
    };
    let scheme = if plain_http || is_localhost(host) {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

fn is_localhost(host: &str) -> bool {
    let name = host
        .rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map(|(name, _)| name)
        .unwrap_or(host);
    matches!(name, "localhost" | "127.0.0.1" | "[::1]")
}

#[async_trait]
impl Store for RemoteStore {
    fn locator(&self) -> &str {
        &self.locator
    }

    async fn resolve(&self, identifier: &str) -> Result<Descriptor> {
        let response = self
            .client
            .fetch_manifest(&self.repository, identifier)
            .await?;

        let digest = match response.digest.as_deref().map(Digest::from_str) {
            Some(Ok(digest)) => digest,
            _ => match Digest::from_str(identifier) {
                Ok(digest) => digest,
                Err(_) => Digest::sha256_of(&response.content)?,
            },
        };
        let media_type = match response.media_type {
            Some(media_type) => media_type,
            None => ManifestSummary::from_bytes(&response.content)?.effective_media_type(),
        };

        Ok(new_descriptor(
            &media_type,
            &digest,
            response.content.len() as u64,
        ))
    }

    async fn referrers(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        self.client
            .fetch_referrers(&self.repository, &subject.digest().to_string())
            .await
    }

    async fn fetch_manifest(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let response = self
            .client
            .fetch_manifest(&self.repository, &descriptor.digest().to_string())
            .await?;
        Ok(response.content)
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
