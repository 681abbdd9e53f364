//! OCI specification data structures.
//!
//! This module re-exports the necessary data structures from the `oci-spec`
//! crate and adds a lenient manifest reader used to derive referrer
//! descriptors from raw manifest content.

pub use oci_spec::image::{Descriptor, MediaType, Platform};

use crate::digest::Digest;
use crate::error::{Result, RelError};
use serde::Deserialize;
use std::collections::HashMap;

/// Media type of an OCI image index.
pub const MEDIA_TYPE_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Media type of an OCI image manifest.
pub const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Media type of a Docker manifest list.
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Media type of a Docker image manifest.
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Annotation holding the tag of a manifest in an OCI image layout.
pub const ANNOTATION_REF_NAME: &str = "org.opencontainers.image.ref.name";

/// Config media type of the empty JSON descriptor; never used as an artifact type.
const MEDIA_TYPE_EMPTY_JSON: &str = "application/vnd.oci.empty.v1+json";

/// Manifest media types accepted when fetching from a registry.
pub const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.manifest.v1+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.docker.distribution.manifest.list.v2+json";

/// The config reference of an image manifest, reduced to its media type.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub media_type: Option<String>,
}

/// The fields of a manifest or index that matter for referrer discovery.
///
/// Parsing is intentionally lenient: unknown fields are ignored and every
/// field is optional, so Docker manifests, OCI manifests and OCI indexes all
/// read into the same shape.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSummary {
    pub media_type: Option<String>,
    pub artifact_type: Option<String>,
    pub config: Option<ConfigSummary>,
    pub subject: Option<Descriptor>,
    pub manifests: Option<Vec<Descriptor>>,
    pub annotations: Option<HashMap<String, String>>,
}

impl ManifestSummary {
    /// Parses manifest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| RelError::validation_with_source("Failed to parse manifest JSON", e))
    }

    /// Returns true if this is an image index or manifest list.
    pub fn is_index(&self) -> bool {
        match self.media_type.as_deref() {
            Some(mt) => mt == MEDIA_TYPE_IMAGE_INDEX || mt == MEDIA_TYPE_DOCKER_MANIFEST_LIST,
            None => self.manifests.is_some(),
        }
    }

    /// Returns the media type, inferring it from the structure when absent.
    pub fn effective_media_type(&self) -> String {
        match &self.media_type {
            Some(mt) => mt.clone(),
            None if self.manifests.is_some() => MEDIA_TYPE_IMAGE_INDEX.to_string(),
            None => MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
        }
    }

    /// Returns the artifact type the Referrers API would report.
    ///
    /// This is the explicit `artifactType`, falling back to the config media
    /// type of an image manifest. The empty JSON config type is not an
    /// artifact type.
    pub fn effective_artifact_type(&self) -> Option<String> {
        if let Some(artifact_type) = &self.artifact_type {
            return Some(artifact_type.clone());
        }
        self.config
            .as_ref()
            .and_then(|c| c.media_type.clone())
            .filter(|mt| mt != MEDIA_TYPE_EMPTY_JSON)
    }

    /// Returns the subject digest, if the manifest refers to another manifest.
    pub fn subject_digest(&self) -> Option<String> {
        self.subject.as_ref().map(|s| s.digest().to_string())
    }

    /// Builds the descriptor the Referrers API would list for this manifest.
    pub fn referrer_descriptor(&self, digest: &Digest, size: u64) -> Descriptor {
        let mut descriptor = new_descriptor(&self.effective_media_type(), digest, size);
        descriptor.set_artifact_type(
            self.effective_artifact_type()
                .map(|at| MediaType::from(at.as_str())),
        );
        descriptor.set_annotations(self.annotations.clone().filter(|a| !a.is_empty()));
        descriptor
    }
}

/// Creates a plain descriptor with only media type, digest and size.
pub fn new_descriptor(media_type: &str, digest: &Digest, size: u64) -> Descriptor {
    Descriptor::new(MediaType::from(media_type), size, digest.as_oci().clone())
}

/// Returns the artifact type of a descriptor as a string, if any.
pub fn artifact_type_of(descriptor: &Descriptor) -> Option<String> {
    descriptor.artifact_type().as_ref().map(|at| at.to_string())
}

/// Returns the descriptor's digest as a `Digest`.
pub fn digest_of(descriptor: &Descriptor) -> Digest {
    Digest::from(descriptor.digest().clone())
}

#[cfg(test)]
mod tests;
